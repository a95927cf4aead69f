//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/qbtree/qbtree.toml`
//! 3. Local config: `<dir>/.qbtree.toml`
//! 4. Environment variables: `QBTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::EngineError;
use crate::domain::{DragOptions, OperatorDefinition, QueryBuilderConfig, RuleDefinition};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Registry entries that can be merged by identifier.
pub trait Definition: Clone {
    fn identifier(&self) -> &str;
}

impl Definition for OperatorDefinition {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl<V: Clone> Definition for RuleDefinition<V> {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Unified configuration for qbtree.
///
/// Field order matters for TOML output: plain values before tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Maximum group nesting depth, root included
    pub max_depth: Option<usize>,
    /// Drag options handed to the drag collaborator
    pub dragging: Option<DragOptions>,
    pub operators: Vec<OperatorDefinition>,
    pub rules: Vec<RuleDefinition>,
}

impl Default for Settings {
    fn default() -> Self {
        let registry = QueryBuilderConfig::default();
        Self {
            pretty: true,
            max_depth: None,
            dragging: None,
            operators: registry.operators,
            rules: registry.rules,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub pretty: Option<bool>,
    pub max_depth: Option<usize>,
    pub dragging: Option<DragOptions>,
    pub operators: Option<Vec<OperatorDefinition>>,
    pub rules: Option<Vec<RuleDefinition>>,
}

/// Union by identifier with negation support.
///
/// Overlay entries replace base entries in place, new identifiers are appended
/// in overlay order, and an identifier prefixed with `!` removes the inherited
/// entry of that name.
pub fn merge_definitions<T: Definition>(base: &[T], overlay: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = base.to_vec();
    for entry in overlay {
        if let Some(negated) = entry.identifier().strip_prefix('!') {
            merged.retain(|existing| existing.identifier() != negated);
            continue;
        }
        match merged
            .iter_mut()
            .find(|existing| existing.identifier() == entry.identifier())
        {
            Some(existing) => *existing = entry.clone(),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

/// Get the XDG config directory for qbtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "qbtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("qbtree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".qbtree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(fs: &dyn FileSystem, path: &Path) -> Result<RawSettings, EngineError> {
    let content = fs.read_to_string(path).map_err(|e| EngineError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| EngineError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Registries and drag options as handed to a [`crate::application::QueryBuilder`].
    pub fn builder_config(&self) -> QueryBuilderConfig {
        QueryBuilderConfig {
            operators: self.operators.clone(),
            rules: self.rules.clone(),
            dragging: self.dragging.clone(),
            max_depth: self.max_depth,
        }
    }

    /// Apply global config onto defaults: definition lists REPLACE.
    ///
    /// The compiled registries are placeholders; the global file defines
    /// the real baseline.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            pretty: global.pretty.unwrap_or(self.pretty),
            max_depth: global.max_depth.or(self.max_depth),
            dragging: global.dragging.clone().or_else(|| self.dragging.clone()),
            operators: global
                .operators
                .clone()
                .unwrap_or_else(|| self.operators.clone()),
            rules: global.rules.clone().unwrap_or_else(|| self.rules.clone()),
        }
    }

    /// Merge local config onto self: definition lists UNION by identifier.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            pretty: overlay.pretty.unwrap_or(self.pretty),
            max_depth: overlay.max_depth.or(self.max_depth),
            dragging: overlay.dragging.clone().or_else(|| self.dragging.clone()),
            operators: overlay
                .operators
                .as_ref()
                .map(|o| merge_definitions(&self.operators, o))
                .unwrap_or_else(|| self.operators.clone()),
            rules: overlay
                .rules
                .as_ref()
                .map(|o| merge_definitions(&self.rules, o))
                .unwrap_or_else(|| self.rules.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.qbtree.toml`
    pub fn load(fs: &dyn FileSystem, local_dir: Option<&Path>) -> Result<Self, EngineError> {
        Self::load_from(fs, global_config_path().as_deref(), local_dir)
    }

    /// Load settings from an explicit global file and local directory.
    pub fn load_layers(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, EngineError> {
        Self::load_from(&RealFileSystem, global_path, local_dir)
    }

    /// Load settings, reading config files through `fs`.
    pub fn load_from(
        fs: &dyn FileSystem,
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, EngineError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config (REPLACES default registries)
        if let Some(global_path) = global_path {
            if fs.exists(global_path) {
                debug!("loading global config {}", global_path.display());
                let raw = load_raw_settings(fs, global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Local config (UNION with current registries)
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if fs.exists(&local_path) {
                debug!("loading local config {}", local_path.display());
                let raw = load_raw_settings(fs, &local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (replace - explicit override)
        Self::apply_env_overrides(current)
    }

    /// Apply QBTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, EngineError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("QBTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("pretty") {
            settings.pretty = val;
        }
        if let Ok(val) = config.get_int("max_depth") {
            settings.max_depth = Some(usize::try_from(val).map_err(|_| EngineError::Config {
                message: format!("QBTREE_MAX_DEPTH must be non-negative, got {val}"),
            })?);
        }
        if let Ok(val) = config.get_bool("dragging.disabled") {
            settings.dragging.get_or_insert_with(DragOptions::default).disabled = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# qbtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/qbtree/qbtree.toml  (defines your baseline)
#   Local:  <dir>/.qbtree.toml            (project-specific additions)
#   Env:    QBTREE_* environment variables (explicit overrides)
#
# Registry Merge Semantics:
#   Global operators/rules REPLACE the compiled defaults.
#   Local operators/rules are merged by identifier (local entry wins);
#   an identifier prefixed with "!" removes the inherited entry.

# Pretty-print JSON output
# pretty = true

# Maximum group nesting depth, root included
# max_depth = 4

# [dragging]
# animation = 300
# disabled = false
# ghostClass = "ghost"

# [[operators]]
# identifier = "AND"
# name = "AND"

# [[rules]]
# identifier = "txt"
# name = "Text Selection"
# initialValue = ""
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> EngineError {
    EngineError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_definitions_replaces_and_appends() {
        let base = vec![
            OperatorDefinition::new("AND", "AND"),
            OperatorDefinition::new("OR", "OR"),
        ];
        let overlay = vec![
            OperatorDefinition::new("OR", "Either"),
            OperatorDefinition::new("NOT", "Not"),
        ];
        let merged = merge_definitions(&base, &overlay);
        assert_eq!(
            merged,
            vec![
                OperatorDefinition::new("AND", "AND"),
                OperatorDefinition::new("OR", "Either"),
                OperatorDefinition::new("NOT", "Not"),
            ]
        );
    }

    #[test]
    fn test_merge_definitions_negation_removes_inherited() {
        let base = vec![
            OperatorDefinition::new("AND", "AND"),
            OperatorDefinition::new("OR", "OR"),
        ];
        let overlay = vec![OperatorDefinition::new("!OR", "")];
        let merged = merge_definitions(&base, &overlay);
        assert_eq!(merged, vec![OperatorDefinition::new("AND", "AND")]);
    }

    #[test]
    fn test_merge_definitions_negation_nonexistent_is_noop() {
        let base = vec![OperatorDefinition::new("AND", "AND")];
        let overlay = vec![OperatorDefinition::new("!XOR", "")];
        assert_eq!(merge_definitions(&base, &overlay), base);
    }

    #[test]
    fn test_default_settings_round_trip_through_toml() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
