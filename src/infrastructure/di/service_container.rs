//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::{EngineResult, QueryBuilder};
use crate::config::Settings;
use crate::domain::RuleSet;
use crate::infrastructure::store::DocumentStore;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// JSON document access
    pub store: DocumentStore,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let store = DocumentStore::new(Arc::clone(&fs));

        Self {
            settings,
            fs,
            store,
        }
    }

    /// Mount a query builder on `tree` with the configured registries.
    pub fn query_builder(&self, tree: RuleSet) -> EngineResult<QueryBuilder> {
        QueryBuilder::mount(self.settings.builder_config(), tree)
    }
}
