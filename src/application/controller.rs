//! Group node controller
//!
//! Structural edits scoped to a single group's ordered child list inside the
//! working arena.

use generational_arena::Index;
use tracing::{debug, warn};

use crate::domain::{DomainError, DomainResult, GroupPath, NodeData, QueryArena, QueryNode};

/// Mutable view on one group of a [`QueryArena`].
///
/// Every operation bounds-checks its indices before touching the child list,
/// so a failed call leaves the group unchanged.
pub struct GroupController<'a, V> {
    arena: &'a mut QueryArena<V>,
    group: Index,
    path: GroupPath,
}

impl<'a, V: Clone + PartialEq> GroupController<'a, V> {
    /// Open the controller of the group at `path`.
    pub fn open(arena: &'a mut QueryArena<V>, path: &GroupPath) -> DomainResult<Self> {
        let group = arena.resolve(path)?;
        Ok(Self {
            arena,
            group,
            path: path.clone(),
        })
    }

    /// Open a group by its arena key; `path` only labels errors and logs.
    ///
    /// Returns `None` when the group has been freed.
    pub fn open_key(arena: &'a mut QueryArena<V>, group: Index, path: &GroupPath) -> Option<Self> {
        arena.get_node(group)?;
        Some(Self {
            arena,
            group,
            path: path.clone(),
        })
    }

    /// Stable arena key of the controlled group.
    pub fn key(&self) -> Index {
        self.group
    }

    pub fn len(&self) -> usize {
        self.arena
            .get_node(self.group)
            .map_or(0, |node| node.children.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key of the child at `index`, the one a `removed` half refers to.
    ///
    /// The index is authoritative; a child that differs from `reported` is
    /// only logged.
    pub fn reported_child(&self, index: usize, reported: &QueryNode<V>) -> DomainResult<Index> {
        self.check_existing(index, self.len())?;
        let child = self.children()[index];
        if self.arena.node_value(child).as_ref() != Some(reported) {
            warn!(
                "element at {}[{}] differs from the reported element, following the index",
                self.path, index
            );
        }
        Ok(child)
    }

    /// Key of the child an insertion at `index` goes in front of; `None`
    /// for an append.
    pub fn insert_anchor(&self, index: usize) -> DomainResult<Option<Index>> {
        self.check_insert(index)?;
        Ok(self.children().get(index).copied())
    }

    /// Current position of a direct child.
    pub fn position_of(&self, child: Index) -> Option<usize> {
        self.children().iter().position(|&c| c == child)
    }

    /// Remove the child at `old_index` and re-insert it at `new_index` of the
    /// shortened sequence. Equal indices still perform both steps.
    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> DomainResult<()> {
        let len = self.len();
        self.check_existing(old_index, len)?;
        self.check_existing(new_index, len)?;
        let children = self.children_mut()?;
        let node = children.remove(old_index);
        children.insert(new_index, node);
        debug!("reordered {} {} -> {}", self.path, old_index, new_index);
        Ok(())
    }

    /// Unlink the child at `index`; the subtree stays in the arena.
    pub fn detach(&mut self, index: usize) -> DomainResult<Index> {
        let len = self.len();
        self.check_existing(index, len)?;
        let node = self.children_mut()?.remove(index);
        debug!("detached {}[{}]", self.path, index);
        Ok(node)
    }

    /// Unlink a direct child by key; `None` if it is no longer a child.
    pub fn detach_key(&mut self, child: Index) -> Option<usize> {
        let position = self.position_of(child)?;
        self.children_mut().ok()?.remove(position);
        debug!("detached {}[{}]", self.path, position);
        Some(position)
    }

    /// Link an already detached subtree in at `index`.
    pub fn attach(&mut self, index: usize, node: Index) -> DomainResult<()> {
        self.check_insert(index)?;
        self.children_mut()?.insert(index, node);
        debug!("attached {}[{}]", self.path, index);
        Ok(())
    }

    pub fn set_operator(&mut self, operator_identifier: &str) -> DomainResult<()> {
        let path = &self.path;
        let node = self
            .arena
            .get_node_mut(self.group)
            .ok_or_else(|| DomainError::GroupNotFound(path.clone()))?;
        node.data = NodeData::Group {
            operator_identifier: operator_identifier.to_string(),
        };
        Ok(())
    }

    /// Replace the value of the rule at child `index`.
    pub fn set_rule_value(&mut self, index: usize, new_value: V) -> DomainResult<()> {
        let len = self.len();
        self.check_existing(index, len)?;
        let child = self.children_mut()?[index];
        match self.arena.get_node_mut(child).map(|node| &mut node.data) {
            Some(NodeData::Rule { value, .. }) => {
                *value = new_value;
                Ok(())
            }
            _ => Err(DomainError::NotARule {
                group: self.path.clone(),
                index,
            }),
        }
    }

    fn children(&self) -> &[Index] {
        self.arena
            .get_node(self.group)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    fn children_mut(&mut self) -> DomainResult<&mut Vec<Index>> {
        let path = &self.path;
        self.arena
            .get_node_mut(self.group)
            .map(|node| &mut node.children)
            .ok_or_else(|| DomainError::GroupNotFound(path.clone()))
    }

    fn check_existing(&self, index: usize, len: usize) -> DomainResult<()> {
        if index >= len {
            return Err(self.out_of_range(index, len));
        }
        Ok(())
    }

    fn check_insert(&self, index: usize) -> DomainResult<()> {
        let len = self.len();
        if index > len {
            return Err(self.out_of_range(index, len));
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize, len: usize) -> DomainError {
        DomainError::IndexOutOfRange {
            group: self.path.clone(),
            index,
            len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuleSet;
    use serde_json::{json, Value};

    fn rule(value: &str) -> QueryNode<Value> {
        QueryNode::rule("txt", json!(value))
    }

    fn arena() -> QueryArena<Value> {
        QueryArena::from_rule_set(
            &RuleSet::new("AND").with_children(vec![rule("D"), rule("E"), rule("F")]),
        )
    }

    fn values(controller: &GroupController<'_, Value>) -> Vec<QueryNode<Value>> {
        controller
            .arena
            .group_value(controller.group)
            .map(|g| g.children)
            .unwrap_or_default()
    }

    #[test]
    fn test_reorder_with_equal_indices_keeps_order() {
        let mut arena = arena();
        let mut controller = GroupController::open(&mut arena, &GroupPath::root()).unwrap();
        controller.reorder(1, 1).unwrap();
        assert_eq!(values(&controller), vec![rule("D"), rule("E"), rule("F")]);
        controller.reorder(0, 2).unwrap();
        assert_eq!(values(&controller), vec![rule("E"), rule("F"), rule("D")]);
    }

    #[test]
    fn test_reported_child_follows_index() {
        let mut arena = arena();
        let controller = GroupController::open(&mut arena, &GroupPath::root()).unwrap();
        let reported = controller.reported_child(1, &rule("E")).unwrap();
        let mismatched = controller.reported_child(1, &rule("Q")).unwrap();
        assert_eq!(reported, mismatched);
        assert_eq!(controller.position_of(reported), Some(1));
        assert!(controller.reported_child(3, &rule("E")).is_err());
    }

    #[test]
    fn test_detach_key_and_anchor() {
        let mut arena = arena();
        let mut controller = GroupController::open(&mut arena, &GroupPath::root()).unwrap();
        let anchor = controller.insert_anchor(2).unwrap().unwrap();
        assert_eq!(controller.insert_anchor(3).unwrap(), None);

        let first = controller.reported_child(0, &rule("D")).unwrap();
        assert_eq!(controller.detach_key(first), Some(0));
        assert_eq!(controller.detach_key(first), None);
        assert_eq!(controller.position_of(anchor), Some(1));
        assert_eq!(values(&controller), vec![rule("E"), rule("F")]);
    }

    #[test]
    fn test_out_of_range_leaves_group_unchanged() {
        let mut arena = arena();
        let mut controller = GroupController::open(&mut arena, &GroupPath::root()).unwrap();
        let err = controller.insert_anchor(5).unwrap_err();
        assert_eq!(
            err,
            DomainError::IndexOutOfRange {
                group: GroupPath::root(),
                index: 5,
                len: 3
            }
        );
        assert!(controller.detach(3).is_err());
        assert!(controller.reorder(0, 3).is_err());
        assert_eq!(values(&controller), vec![rule("D"), rule("E"), rule("F")]);
    }

    #[test]
    fn test_empty_group_rejects_reorder_and_detach() {
        let mut arena = QueryArena::from_rule_set(&RuleSet::<Value>::new("OR"));
        let mut controller = GroupController::open(&mut arena, &GroupPath::root()).unwrap();
        assert!(controller.is_empty());
        assert!(matches!(
            controller.reorder(0, 0),
            Err(DomainError::IndexOutOfRange { index: 0, len: 0, .. })
        ));
        assert!(controller.detach(0).is_err());
        assert_eq!(controller.insert_anchor(0), Ok(None));
    }
}
