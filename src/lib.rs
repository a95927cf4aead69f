//! qbtree: tree-mutation engine for nested boolean query builders.
//!
//! A query is a root [`domain::RuleSet`] whose children are rules or nested
//! groups. Drag gestures arrive either as atomic [`application::Gesture`]s or
//! as per-group change notifications that the
//! [`application::MoveReconciler`] settles into edits. Every completed
//! gesture produces exactly one new root value, assembled from a working copy
//! so the owner's tree is never mutated in place.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{apply_gesture, apply_gestures, EngineError, EngineResult, QueryBuilder};
pub use domain::{GroupPath, QueryNode, Rule, RuleSet};
