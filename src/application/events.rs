//! Drag notifications consumed by the engine and emissions it produces.

use serde::{Deserialize, Serialize};

use crate::domain::{GroupPath, QueryNode, RuleSet, RuleValue};

/// Change reported by the drag collaborator for one group.
///
/// Serialized externally tagged, i.e. `{"moved": {...}}`, `{"added": {...}}`
/// or `{"removed": {...}}`, exactly one key per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEvent<V = RuleValue> {
    /// Reorder inside the group
    Moved(Moved<V>),
    /// Element arrived from another group
    Added(Added<V>),
    /// Element left for another group
    Removed(Removed<V>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moved<V = RuleValue> {
    pub element: QueryNode<V>,
    pub old_index: usize,
    pub new_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Added<V = RuleValue> {
    pub element: QueryNode<V>,
    pub new_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removed<V = RuleValue> {
    pub element: QueryNode<V>,
    pub old_index: usize,
}

impl<V> ChangeEvent<V> {
    pub fn moved(element: QueryNode<V>, old_index: usize, new_index: usize) -> Self {
        Self::Moved(Moved {
            element,
            old_index,
            new_index,
        })
    }

    pub fn added(element: QueryNode<V>, new_index: usize) -> Self {
        Self::Added(Added { element, new_index })
    }

    pub fn removed(element: QueryNode<V>, old_index: usize) -> Self {
        Self::Removed(Removed { element, old_index })
    }
}

/// A change event addressed to the group that observed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification<V = RuleValue> {
    pub group: GroupPath,
    pub event: ChangeEvent<V>,
}

impl<V> Notification<V> {
    pub fn new(group: GroupPath, event: ChangeEvent<V>) -> Self {
        Self { group, event }
    }
}

/// Local "children changed" signal of one group, addressed by its final path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupUpdate<V = RuleValue> {
    pub path: GroupPath,
    pub group: RuleSet<V>,
}

/// Result of one gesture: the group updates along every touched chain
/// (deepest first, root last) and the single new tree value for the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission<V = RuleValue> {
    pub updates: Vec<GroupUpdate<V>>,
    pub tree: RuleSet<V>,
}

impl<V> Emission<V> {
    /// Update reported by the group that ended up at `path`.
    pub fn update_for(&self, path: &GroupPath) -> Option<&RuleSet<V>> {
        self.updates
            .iter()
            .find(|update| &update.path == path)
            .map(|update| &update.group)
    }
}
