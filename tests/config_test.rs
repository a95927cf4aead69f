//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION by identifier with negation support
//! - Any → Env vars: REPLACE (explicit user override)

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use qbtree::application::QueryBuilder;
use qbtree::config::{local_config_path, Settings};
use qbtree::domain::{OperatorDefinition, RuleDefinition, RuleSet};
use qbtree::infrastructure::traits::FileSystem;

/// Config files held in memory; nothing touches the disk.
struct MemoryFs(HashMap<PathBuf, String>);

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn write(&self, _path: &Path, _content: &str) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

fn identifiers(settings: &Settings) -> (Vec<&str>, Vec<&str>) {
    (
        settings
            .operators
            .iter()
            .map(|o| o.identifier.as_str())
            .collect(),
        settings.rules.iter().map(|r| r.identifier.as_str()).collect(),
    )
}

#[test]
fn given_no_config_files_when_load_then_compiled_defaults() {
    // Arrange
    let local_dir = TempDir::new().unwrap();

    // Act
    let settings = Settings::load_layers(None, Some(local_dir.path())).expect("load settings");

    // Assert
    assert_eq!(identifiers(&settings), (vec!["AND", "OR"], vec!["txt", "num"]));
    assert!(settings.pretty);
    assert_eq!(settings.max_depth, None);
    assert_eq!(settings.dragging, None);
}

#[test]
fn given_local_config_with_rules_when_load_then_unions_with_current() {
    // Arrange
    let local_dir = TempDir::new().unwrap();
    let local_config = r#"
max_depth = 4

[[rules]]
identifier = "num"
name = "Amount"
initialValue = 0

[[rules]]
identifier = "date"
name = "Date Selection"
initialValue = "2020-01-01"
"#;
    fs::write(local_config_path(local_dir.path()), local_config).unwrap();

    // Act
    let settings = Settings::load_layers(None, Some(local_dir.path())).expect("load settings");

    // Assert: num replaced in place, date appended
    assert_eq!(
        settings.rules,
        vec![
            RuleDefinition::new("txt", "Text Selection", json!("")),
            RuleDefinition::new("num", "Amount", json!(0)),
            RuleDefinition::new("date", "Date Selection", json!("2020-01-01")),
        ]
    );
    assert_eq!(settings.max_depth, Some(4));
    assert_eq!(settings.operators.len(), 2, "operators untouched");
}

#[test]
fn given_local_config_with_negation_when_load_then_removes_inherited_operator() {
    // Arrange
    let local_dir = TempDir::new().unwrap();
    let local_config = r#"
[[operators]]
identifier = "!OR"
name = ""

[[operators]]
identifier = "NOT"
name = "Not"
"#;
    fs::write(local_config_path(local_dir.path()), local_config).unwrap();

    // Act
    let settings = Settings::load_layers(None, Some(local_dir.path())).expect("load settings");

    // Assert
    assert_eq!(
        settings.operators,
        vec![
            OperatorDefinition::new("AND", "AND"),
            OperatorDefinition::new("NOT", "Not"),
        ]
    );
}

#[test]
fn given_global_config_when_load_then_replaces_default_registries() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let global_path = global_dir.path().join("qbtree.toml");
    let global_config = r#"
pretty = false

[[operators]]
identifier = "ALL"
name = "All of"

[[operators]]
identifier = "ANY"
name = "Any of"
"#;
    fs::write(&global_path, global_config).unwrap();

    // Act
    let settings = Settings::load_layers(Some(&global_path), None).expect("load settings");

    // Assert
    assert_eq!(identifiers(&settings).0, vec!["ALL", "ANY"]);
    assert_eq!(identifiers(&settings).1, vec!["txt", "num"], "rules inherited");
    assert!(!settings.pretty);
}

#[test]
fn given_global_and_local_config_when_load_then_local_unions_with_global() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let global_path = global_dir.path().join("qbtree.toml");
    fs::write(
        &global_path,
        r#"
[[operators]]
identifier = "ALL"
name = "All of"
"#,
    )
    .unwrap();

    let local_dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(local_dir.path()),
        r#"
[dragging]
disabled = true
ghostClass = "ghost"

[[operators]]
identifier = "ANY"
name = "Any of"
"#,
    )
    .unwrap();

    // Act
    let settings =
        Settings::load_layers(Some(&global_path), Some(local_dir.path())).expect("load settings");

    // Assert
    assert_eq!(identifiers(&settings).0, vec!["ALL", "ANY"]);
    let dragging = settings.dragging.clone().expect("dragging configured");
    assert!(dragging.disabled);
    assert_eq!(dragging.ghost_class.as_deref(), Some("ghost"));
    assert!(!settings.builder_config().drag_enabled());
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let local_dir = TempDir::new().unwrap();
    fs::write(local_config_path(local_dir.path()), "max_depth = \"deep\"").unwrap();

    let result = Settings::load_layers(None, Some(local_dir.path()));

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("config error"));
}

#[test]
fn given_loaded_settings_when_mounting_then_builder_uses_merged_registries() {
    // Arrange
    let local_dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(local_dir.path()),
        r#"
[[operators]]
identifier = "NOR"
name = "Neither"
"#,
    )
    .unwrap();
    let settings = Settings::load_layers(None, Some(local_dir.path())).unwrap();

    // Act
    let builder = QueryBuilder::mount(settings.builder_config(), RuleSet::new("NOR"));

    // Assert
    assert!(builder.is_ok());
}

#[test]
fn given_template_when_parsed_then_yields_defaults() {
    let parsed: Settings = toml::from_str(&Settings::template()).expect("template is valid TOML");
    assert_eq!(parsed, Settings::default());
}

#[test]
fn given_config_files_behind_filesystem_when_load_from_then_read_through_it() {
    // Arrange
    let global = PathBuf::from("/virtual/global/qbtree.toml");
    let local_dir = PathBuf::from("/virtual/project");
    let fs = MemoryFs(HashMap::from([
        (global.clone(), "pretty = false\nmax_depth = 3\n".to_string()),
        (
            local_config_path(&local_dir),
            "[[rules]]\nidentifier = \"!num\"\nname = \"\"\ninitialValue = 0\n".to_string(),
        ),
    ]));

    // Act
    let settings = Settings::load_from(&fs, Some(&global), Some(&local_dir)).expect("load");

    // Assert
    assert!(!settings.pretty);
    assert_eq!(settings.max_depth, Some(3));
    assert_eq!(identifiers(&settings).1, vec!["txt"]);
}
