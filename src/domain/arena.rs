use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{OperatorId, QueryNode, Rule, RuleSet, RuleTypeId, RuleValue};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path::GroupPath;

/// Data payload for arena nodes.
#[derive(Debug, Clone)]
pub enum NodeData<V> {
    Rule { identifier: RuleTypeId, value: V },
    Group { operator_identifier: OperatorId },
}

/// Node in the arena-based query tree.
#[derive(Debug)]
pub struct TreeNode<V> {
    pub data: NodeData<V>,
    /// Ordered keys of direct children; always empty for rules
    pub children: Vec<Index>,
}

impl<V> TreeNode<V> {
    pub fn is_group(&self) -> bool {
        matches!(self.data, NodeData::Group { .. })
    }
}

/// Arena-based working copy of a query tree.
///
/// Every node gets a stable key for the lifetime of the arena, so a subtree can
/// be detached from one group and re-attached to another without copying and
/// without any parent pointers. Nodes that are detached stay alive until they
/// are attached again or freed with [`QueryArena::free_subtree`].
#[derive(Debug)]
pub struct QueryArena<V = RuleValue> {
    arena: Arena<TreeNode<V>>,
    root: Index,
}

impl<V: Clone> QueryArena<V> {
    /// Deep-copy a tree value into a fresh arena.
    #[instrument(level = "trace", skip_all)]
    pub fn from_rule_set(tree: &RuleSet<V>) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode {
            data: NodeData::Group {
                operator_identifier: tree.operator_identifier.clone(),
            },
            children: Vec::new(),
        });
        let mut this = Self { arena, root };
        let children: Vec<Index> = tree
            .children
            .iter()
            .map(|child| this.insert_subtree(child))
            .collect();
        this.arena[root].children = children;
        this
    }

    /// Insert a detached deep copy of `node`; attach it with a group controller.
    pub fn insert_subtree(&mut self, node: &QueryNode<V>) -> Index {
        match node {
            QueryNode::Rule(rule) => self.arena.insert(TreeNode {
                data: NodeData::Rule {
                    identifier: rule.identifier.clone(),
                    value: rule.value.clone(),
                },
                children: Vec::new(),
            }),
            QueryNode::Group(group) => {
                let children: Vec<Index> = group
                    .children
                    .iter()
                    .map(|child| self.insert_subtree(child))
                    .collect();
                self.arena.insert(TreeNode {
                    data: NodeData::Group {
                        operator_identifier: group.operator_identifier.clone(),
                    },
                    children,
                })
            }
        }
    }

    /// Materialize the whole tree as an independent value.
    #[instrument(level = "trace", skip_all)]
    pub fn to_rule_set(&self) -> DomainResult<RuleSet<V>> {
        self.group_value(self.root)
            .ok_or_else(|| DomainError::GroupNotFound(GroupPath::root()))
    }

    /// Materialize the group stored under `idx`.
    pub fn group_value(&self, idx: Index) -> Option<RuleSet<V>> {
        match self.node_value(idx)? {
            QueryNode::Group(group) => Some(group),
            QueryNode::Rule(_) => None,
        }
    }

    /// Materialize the subtree stored under `idx`.
    pub fn node_value(&self, idx: Index) -> Option<QueryNode<V>> {
        let node = self.arena.get(idx)?;
        Some(match &node.data {
            NodeData::Rule { identifier, value } => QueryNode::Rule(Rule {
                identifier: identifier.clone(),
                value: value.clone(),
            }),
            NodeData::Group {
                operator_identifier,
            } => QueryNode::Group(RuleSet {
                operator_identifier: operator_identifier.clone(),
                children: node
                    .children
                    .iter()
                    .filter_map(|&child| self.node_value(child))
                    .collect(),
            }),
        })
    }
}

impl<V> QueryArena<V> {
    #[instrument(level = "trace", skip(self))]
    pub fn root(&self) -> Index {
        self.root
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&TreeNode<V>> {
        self.arena.get(idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode<V>> {
        self.arena.get_mut(idx)
    }

    /// Resolve a group path against the current shape of the tree.
    #[instrument(level = "trace", skip(self))]
    pub fn resolve(&self, path: &GroupPath) -> DomainResult<Index> {
        let mut current = self.root;
        for (depth, &segment) in path.segments().iter().enumerate() {
            let walked = || GroupPath::new(path.segments()[..=depth].to_vec());
            current = self
                .get_node(current)
                .and_then(|node| node.children.get(segment).copied())
                .ok_or_else(|| DomainError::GroupNotFound(walked()))?;
            if !self.get_node(current).is_some_and(TreeNode::is_group) {
                return Err(DomainError::NotAGroup(walked()));
            }
        }
        Ok(current)
    }

    /// Find the path of an attached group by searching from the root.
    ///
    /// Returns `None` for detached or freed keys.
    #[instrument(level = "trace", skip(self))]
    pub fn locate(&self, target: Index) -> Option<GroupPath> {
        let mut stack = vec![(self.root, GroupPath::root())];
        while let Some((idx, path)) = stack.pop() {
            if idx == target {
                return Some(path);
            }
            if let Some(node) = self.get_node(idx) {
                for (position, &child) in node.children.iter().enumerate() {
                    stack.push((child, path.child(position)));
                }
            }
        }
        None
    }

    /// Free a detached subtree.
    #[instrument(level = "trace", skip(self))]
    pub fn free_subtree(&mut self, idx: Index) {
        let doomed: Vec<Index> = self.iter_postorder_from(idx).map(|(i, _)| i).collect();
        for i in doomed {
            self.arena.remove(i);
        }
    }

    /// Group nesting depth of the attached tree; the root alone has depth 1.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    #[instrument(level = "trace", skip(self))]
    fn calculate_depth(&self, node_idx: Index) -> usize {
        match self.get_node(node_idx) {
            Some(node) if node.is_group() => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.calculate_depth(child))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn iter_postorder_from(&self, start: Index) -> PostOrderIterator<'_, V> {
        PostOrderIterator::new(self, start)
    }
}

/// Post-order walk over a subtree; children come before their group.
pub struct PostOrderIterator<'a, V> {
    arena: &'a QueryArena<V>,
    stack: Vec<(Index, bool)>,
}

impl<'a, V> PostOrderIterator<'a, V> {
    fn new(arena: &'a QueryArena<V>, start: Index) -> Self {
        Self {
            arena,
            stack: vec![(start, false)],
        }
    }
}

impl<'a, V> Iterator for PostOrderIterator<'a, V> {
    type Item = (Index, &'a TreeNode<V>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
