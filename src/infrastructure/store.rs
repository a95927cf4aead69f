//! JSON documents: query trees, gesture scripts and notification logs.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::{Gesture, Notification};
use crate::domain::RuleSet;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::FileSystem;

/// Reads and writes the JSON documents the CLI works with.
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
}

impl DocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load a query tree (root group in the tree model shape).
    #[instrument(level = "debug", skip(self))]
    pub fn load_tree(&self, path: &Path) -> InfraResult<RuleSet> {
        self.read_json(path)
    }

    pub fn save_tree(&self, path: &Path, tree: &RuleSet, pretty: bool) -> InfraResult<()> {
        let content = render_json(tree, pretty)?;
        self.fs
            .write(path, &content)
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
        debug!("saved tree to {}", path.display());
        Ok(())
    }

    /// Load a gesture script: a JSON array of atomic gestures.
    #[instrument(level = "debug", skip(self))]
    pub fn load_gestures(&self, path: &Path) -> InfraResult<Vec<Gesture>> {
        self.read_json(path)
    }

    /// Load a notification log: a JSON array of cycles, each an array of
    /// `{ "group": [...], "event": {...} }` notifications.
    #[instrument(level = "debug", skip(self))]
    pub fn load_cycles(&self, path: &Path) -> InfraResult<Vec<Vec<Notification>>> {
        self.read_json(path)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> InfraResult<T> {
        if !self.fs.exists(path) {
            return Err(InfraError::io(
                format!("file not found: {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| InfraError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Serialize any document for output.
pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> InfraResult<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| InfraError::Serialize(e.to_string()))
}
