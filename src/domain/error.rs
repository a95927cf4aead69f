//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::path::GroupPath;

/// Domain errors represent structural violations of the query tree or registries.
/// These are independent of I/O and configuration loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("index {index} out of range for group {group} with {len} children")]
    IndexOutOfRange {
        group: GroupPath,
        index: usize,
        len: usize,
    },

    #[error("group not found: {0}")]
    GroupNotFound(GroupPath),

    #[error("not a group: {0}")]
    NotAGroup(GroupPath),

    #[error("not a rule: child {index} of group {group}")]
    NotARule { group: GroupPath, index: usize },

    #[error("invalid group path: {0:?}")]
    InvalidPath(String),

    #[error("cannot move {node} into its own subtree at {target}")]
    MoveIntoOwnSubtree { node: GroupPath, target: GroupPath },

    #[error("query depth {depth} exceeds maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("unknown rule identifier: {0}")]
    UnknownRuleIdentifier(String),

    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("no operators configured")]
    NoOperators,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
