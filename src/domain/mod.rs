//! Domain layer: query tree model, addressing and registries
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod path;
pub mod registry;

pub use arena::{NodeData, QueryArena, TreeNode};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use path::{GroupPath, PathRelation};
pub use registry::{DragOptions, OperatorDefinition, QueryBuilderConfig, RuleDefinition};
