//! Atomic structural edits.
//!
//! A gesture names both endpoints of an edit up front, so no pairing of
//! per-group notifications is needed. Paths always refer to the tree as it was
//! before the gesture.

use serde::{Deserialize, Serialize};

use crate::domain::{GroupPath, OperatorId, QueryNode, RuleValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Gesture<V = RuleValue> {
    /// Move a child inside one group; `new_index` counts in the shortened sequence.
    Reorder {
        group: GroupPath,
        #[serde(rename = "oldIndex")]
        old_index: usize,
        #[serde(rename = "newIndex")]
        new_index: usize,
    },
    /// Move child `from_index` of `from` into `to` at `to_index`.
    ///
    /// `to_index` counts in the destination's children after the removal.
    Relocate {
        from: GroupPath,
        #[serde(rename = "fromIndex")]
        from_index: usize,
        to: GroupPath,
        #[serde(rename = "toIndex")]
        to_index: usize,
    },
    /// Delete a child and its subtree.
    Remove { group: GroupPath, index: usize },
    /// Insert a deep copy of `node`.
    Insert {
        group: GroupPath,
        index: usize,
        node: QueryNode<V>,
    },
    SetOperator {
        group: GroupPath,
        operator: OperatorId,
    },
    /// Replace the value of the rule at child `index` of `group`.
    SetValue {
        group: GroupPath,
        index: usize,
        value: V,
    },
}

impl<V> Gesture<V> {
    pub fn reorder(group: GroupPath, old_index: usize, new_index: usize) -> Self {
        Self::Reorder {
            group,
            old_index,
            new_index,
        }
    }

    pub fn relocate(from: GroupPath, from_index: usize, to: GroupPath, to_index: usize) -> Self {
        Self::Relocate {
            from,
            from_index,
            to,
            to_index,
        }
    }
}
