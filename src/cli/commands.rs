//! Command dispatch
//!
//! Every command loads its settings, mounts a [`crate::application::QueryBuilder`]
//! through the [`ServiceContainer`] and writes results via [`output`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::{Emission, Gesture};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::RuleSet;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::{render_json, InfraError, ServiceContainer};
use crate::tree_traits::ToTermTree;

/// Execute the parsed command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Show { file, json }) => cmd_show(&create_container(cli)?, file, *json),
        Some(Commands::Validate { file }) => cmd_validate(&create_container(cli)?, file),
        Some(Commands::Apply {
            file,
            gestures,
            output,
            updates,
        }) => cmd_apply(
            &create_container(cli)?,
            file,
            gestures,
            output.as_deref(),
            *updates,
        ),
        Some(Commands::Move {
            file,
            from,
            from_index,
            to,
            to_index,
            output,
        }) => cmd_move(
            &create_container(cli)?,
            file,
            Gesture::relocate(from.clone(), *from_index, to.clone(), *to_index),
            output.as_deref(),
        ),
        Some(Commands::Replay { file, log, output }) => {
            cmd_replay(&create_container(cli)?, file, log, output.as_deref())
        }
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "qbtree", &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

fn config_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

fn load_settings(cli: &Cli, fs: &dyn FileSystem) -> CliResult<Settings> {
    let dir = config_dir(cli)?;
    let mut settings = Settings::load(fs, Some(&dir))?;
    if cli.compact {
        settings.pretty = false;
    }
    Ok(settings)
}

fn create_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let settings = load_settings(cli, fs.as_ref())?;
    Ok(ServiceContainer::with_deps(settings, fs))
}

/// Print `tree` or save it to `target`.
fn emit_tree(container: &ServiceContainer, tree: &RuleSet, target: Option<&Path>) -> CliResult<()> {
    match target {
        Some(path) => {
            container
                .store
                .save_tree(path, tree, container.settings.pretty)?;
            output::action("Wrote", &path.display());
        }
        None => output::info(&render_json(tree, container.settings.pretty)?),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_show(container: &ServiceContainer, file: &Path, json: bool) -> CliResult<()> {
    let tree = container.store.load_tree(file)?;
    if json {
        output::info(&render_json(&tree, container.settings.pretty)?);
    } else {
        output::info(&tree.to_term_tree());
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_validate(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let tree = container.store.load_tree(file)?;
    let builder = container.query_builder(tree)?;
    output::success(&format!(
        "{}: {} rules, depth {}",
        file.display(),
        builder.value().rule_count(),
        builder.value().depth()
    ));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_apply(
    container: &ServiceContainer,
    file: &Path,
    gestures: &Path,
    target: Option<&Path>,
    updates: bool,
) -> CliResult<()> {
    let tree = container.store.load_tree(file)?;
    let gestures = container.store.load_gestures(gestures)?;
    let mut builder = container.query_builder(tree)?;

    let mut emissions: Vec<Emission> = Vec::with_capacity(gestures.len());
    for (i, gesture) in gestures.into_iter().enumerate() {
        debug!("gesture {}: {:?}", i, gesture);
        emissions.push(builder.apply(gesture)?);
    }

    if updates {
        output::info(&render_json(&emissions, container.settings.pretty)?);
        if let Some(path) = target {
            container
                .store
                .save_tree(path, builder.value(), container.settings.pretty)?;
            output::action("Wrote", &path.display());
        }
        return Ok(());
    }
    emit_tree(container, builder.value(), target)
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    file: &Path,
    gesture: Gesture,
    target: Option<&Path>,
) -> CliResult<()> {
    let tree = container.store.load_tree(file)?;
    let mut builder = container.query_builder(tree)?;
    let emission = builder.apply(gesture)?;
    emit_tree(container, &emission.tree, target)
}

#[instrument(level = "debug", skip(container))]
fn cmd_replay(
    container: &ServiceContainer,
    file: &Path,
    log: &Path,
    target: Option<&Path>,
) -> CliResult<()> {
    let tree = container.store.load_tree(file)?;
    let cycles = container.store.load_cycles(log)?;
    let mut builder = container.query_builder(tree)?;

    let mut emitted = 0;
    for (i, cycle) in cycles.into_iter().enumerate() {
        for notification in cycle {
            if builder.notify(notification.group, notification.event)?.is_some() {
                emitted += 1;
            }
        }
        match builder.end_cycle()? {
            Some(_) => emitted += 1,
            None => debug!("cycle {} left nothing to settle", i),
        }
    }
    if emitted == 0 {
        output::warning("log produced no emission, tree unchanged");
    }
    debug!("replay produced {} emission(s)", emitted);
    emit_tree(container, builder.value(), target)
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli, &RealFileSystem)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(&config_dir(cli)?)
            };
            init_config(&path)?;
        }
        ConfigCommands::Path => {
            output::header("Config paths");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: <unavailable>"),
            }
            output::detail(&format!(
                "local:  {}",
                local_config_path(&config_dir(cli)?).display()
            ));
        }
    }
    Ok(())
}

fn init_config(path: &Path) -> CliResult<()> {
    write_template(&RealFileSystem, path)
}

fn write_template(fs: &dyn FileSystem, path: &Path) -> CliResult<()> {
    if fs.exists(path) {
        return Err(CliError::InvalidArgs(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs.create_dir_all(parent)
            .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
    }
    fs.write(path, &Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupPath;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_write_template_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(".qbtree.toml");

        write_template(&RealFileSystem, &path).unwrap();
        assert!(path.exists());

        let result = write_template(&RealFileSystem, &path);
        assert!(matches!(result, Err(CliError::InvalidArgs(_))));
    }

    #[test]
    fn test_config_dir_defaults_to_cwd() {
        let cli = Cli {
            debug: 0,
            config_dir: None,
            compact: false,
            command: None,
        };
        assert_eq!(config_dir(&cli).unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_missing_command_is_usage_error() {
        let cli = Cli {
            debug: 0,
            config_dir: Some(std::env::temp_dir()),
            compact: false,
            command: None,
        };
        assert!(matches!(execute_command(&cli), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_group_path_arguments_parse() {
        let cli = Cli::try_parse_from([
            "qbtree", "move", "tree.json", "/0", "0", "/0/3", "1",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Move { from, to, to_index, .. }) => {
                assert_eq!(from, GroupPath::new(vec![0]));
                assert_eq!(to, GroupPath::new(vec![0, 3]));
                assert_eq!(to_index, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
