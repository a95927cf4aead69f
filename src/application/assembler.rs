//! Propagation and root assembly
//!
//! Gestures are applied to a working arena copied from the owner's tree, so
//! the owner's value is never touched and a failed gesture simply drops the
//! arena. Every group whose child list changed is recorded by key; when the
//! assembly finishes, each touched group is walked up to the root and one
//! update per group on those chains is produced (deepest first), followed by
//! exactly one materialized root tree.
//!
//! Gestures run one after another, each against the tree the previous one
//! left behind. Edits settled from one drag cycle all address the tree at the
//! start of the cycle instead, so their endpoints are resolved to arena keys
//! first and applied by key afterwards.

use std::collections::HashSet;

use generational_arena::Index;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::controller::GroupController;
use crate::application::error::EngineResult;
use crate::application::events::{Emission, GroupUpdate};
use crate::application::gesture::Gesture;
use crate::application::reconciler::SettledEdit;
use crate::domain::{
    DomainError, DomainResult, GroupPath, PathRelation, QueryArena, QueryNode, RuleSet,
};

/// A group endpoint pinned to its arena key; the path labels logs and errors.
#[derive(Debug, Clone)]
struct Endpoint {
    key: Index,
    path: GroupPath,
}

impl Endpoint {
    fn new(key: Index, path: &GroupPath) -> Self {
        Self {
            key,
            path: path.clone(),
        }
    }
}

/// A settled edit whose endpoints were resolved before any mutation.
#[derive(Debug)]
enum Resolved<V> {
    Relocate {
        source: Endpoint,
        node: Index,
        target: Endpoint,
        to_index: usize,
    },
    Remove {
        source: Endpoint,
        node: Index,
    },
    Insert {
        target: Endpoint,
        anchor: Option<Index>,
        index: usize,
        element: QueryNode<V>,
    },
}

/// Applies gestures to one working copy and assembles the result.
#[derive(Debug)]
pub struct RootAssembler<V> {
    arena: QueryArena<V>,
    touched: Vec<Index>,
    max_depth: Option<usize>,
}

impl<V: Clone + PartialEq> RootAssembler<V> {
    pub fn new(tree: &RuleSet<V>) -> Self {
        Self {
            arena: QueryArena::from_rule_set(tree),
            touched: Vec::new(),
            max_depth: None,
        }
    }

    /// Reject results nested deeper than `max_depth` groups.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[instrument(level = "debug", skip(self))]
    pub fn apply(&mut self, gesture: &Gesture<V>) -> EngineResult<()>
    where
        V: std::fmt::Debug,
    {
        match gesture {
            Gesture::Reorder {
                group,
                old_index,
                new_index,
            } => {
                let mut controller = GroupController::open(&mut self.arena, group)?;
                controller.reorder(*old_index, *new_index)?;
                let key = controller.key();
                self.touch(key);
            }
            Gesture::Relocate {
                from,
                from_index,
                to,
                to_index,
            } => self.relocate(from, *from_index, to, *to_index)?,
            Gesture::Remove { group, index } => {
                let mut controller = GroupController::open(&mut self.arena, group)?;
                let detached = controller.detach(*index)?;
                let key = controller.key();
                self.arena.free_subtree(detached);
                self.touch(key);
            }
            Gesture::Insert { group, index, node } => {
                let len = GroupController::open(&mut self.arena, group)?.len();
                if *index > len {
                    return Err(DomainError::IndexOutOfRange {
                        group: group.clone(),
                        index: *index,
                        len,
                    }
                    .into());
                }
                let subtree = self.arena.insert_subtree(node);
                let mut controller = GroupController::open(&mut self.arena, group)?;
                controller.attach(*index, subtree)?;
                let key = controller.key();
                self.touch(key);
            }
            Gesture::SetOperator { group, operator } => {
                let mut controller = GroupController::open(&mut self.arena, group)?;
                controller.set_operator(operator)?;
                let key = controller.key();
                self.touch(key);
            }
            Gesture::SetValue {
                group,
                index,
                value,
            } => {
                let mut controller = GroupController::open(&mut self.arena, group)?;
                controller.set_rule_value(*index, value.clone())?;
                let key = controller.key();
                self.touch(key);
            }
        }
        Ok(())
    }

    /// Apply the edits of one settled cycle.
    ///
    /// Every endpoint is resolved against the tree as it is now, before the
    /// first edit runs. A lone insertion lands in front of the child that held
    /// its index at resolution time. An edit whose node or group an earlier
    /// edit of the same cycle already removed is skipped.
    #[instrument(level = "debug", skip_all, fields(edits = edits.len()))]
    pub fn apply_settled(&mut self, edits: &[SettledEdit<V>]) -> EngineResult<()>
    where
        V: std::fmt::Debug,
    {
        let resolved = edits
            .iter()
            .map(|edit| {
                debug!("resolving {:?}", edit.to_gesture());
                self.resolve_settled(edit)
            })
            .collect::<DomainResult<Vec<_>>>()?;
        for edit in resolved {
            self.apply_resolved(edit)?;
        }
        Ok(())
    }

    fn resolve_settled(&mut self, edit: &SettledEdit<V>) -> DomainResult<Resolved<V>> {
        match edit {
            SettledEdit::Relocate {
                from,
                from_index,
                to,
                to_index,
                element,
            } => {
                check_not_own_subtree(from, *from_index, to)?;
                let source = GroupController::open(&mut self.arena, from)?;
                let node = source.reported_child(*from_index, element)?;
                let source = Endpoint::new(source.key(), from);
                let target = Endpoint::new(self.arena.resolve(to)?, to);
                Ok(Resolved::Relocate {
                    source,
                    node,
                    target,
                    to_index: *to_index,
                })
            }
            SettledEdit::Remove {
                group,
                index,
                element,
            } => {
                let source = GroupController::open(&mut self.arena, group)?;
                let node = source.reported_child(*index, element)?;
                Ok(Resolved::Remove {
                    source: Endpoint::new(source.key(), group),
                    node,
                })
            }
            SettledEdit::Insert {
                group,
                index,
                element,
            } => {
                let target = GroupController::open(&mut self.arena, group)?;
                let anchor = target.insert_anchor(*index)?;
                Ok(Resolved::Insert {
                    target: Endpoint::new(target.key(), group),
                    anchor,
                    index: *index,
                    element: element.clone(),
                })
            }
        }
    }

    fn apply_resolved(&mut self, edit: Resolved<V>) -> EngineResult<()> {
        match edit {
            Resolved::Relocate {
                source,
                node,
                target,
                to_index,
            } => {
                if self.arena.get_node(target.key).is_none() {
                    warn!("group {} was removed earlier in the cycle, skipping", target.path);
                    return Ok(());
                }
                if !self.detach_resolved(&source, node) {
                    return Ok(());
                }
                let mut destination =
                    GroupController::open_key(&mut self.arena, target.key, &target.path)
                        .ok_or_else(|| DomainError::GroupNotFound(target.path.clone()))?;
                destination.attach(to_index, node)?;
                debug!("relocated from {} -> {}[{}]", source.path, target.path, to_index);
                self.touch(source.key);
                self.touch(target.key);
            }
            Resolved::Remove { source, node } => {
                if self.detach_resolved(&source, node) {
                    self.arena.free_subtree(node);
                    self.touch(source.key);
                }
            }
            Resolved::Insert {
                target,
                anchor,
                index,
                element,
            } => {
                if self.arena.get_node(target.key).is_none() {
                    warn!("group {} was removed earlier in the cycle, skipping", target.path);
                    return Ok(());
                }
                let subtree = self.arena.insert_subtree(&element);
                let mut destination =
                    GroupController::open_key(&mut self.arena, target.key, &target.path)
                        .ok_or_else(|| DomainError::GroupNotFound(target.path.clone()))?;
                let len = destination.len();
                let position = match anchor {
                    Some(anchor) => destination
                        .position_of(anchor)
                        .unwrap_or_else(|| index.min(len)),
                    None => len,
                };
                destination.attach(position, subtree)?;
                self.touch(target.key);
            }
        }
        Ok(())
    }

    /// Unlink `node` from the group it was resolved in; `false` if an earlier
    /// edit of the cycle already moved or removed it.
    fn detach_resolved(&mut self, source: &Endpoint, node: Index) -> bool {
        let detached = GroupController::open_key(&mut self.arena, source.key, &source.path)
            .and_then(|mut controller| controller.detach_key(node));
        if detached.is_none() {
            warn!("child of {} already left earlier in the cycle, skipping", source.path);
        }
        detached.is_some()
    }

    /// Detach from the source, then attach at the destination.
    ///
    /// `to` was computed against the tree before the removal. When the
    /// destination lies below the source group, the removal can shift the
    /// destination's path segment at the source depth, so the path is rebased
    /// before it is resolved. A destination above or beside the source is
    /// unaffected and used as reported, as is `to_index`, which already counts
    /// in the post-removal destination children.
    fn relocate(
        &mut self,
        from: &GroupPath,
        from_index: usize,
        to: &GroupPath,
        to_index: usize,
    ) -> EngineResult<()> {
        check_not_own_subtree(from, from_index, to)?;
        let moved = from.child(from_index);

        let mut source = GroupController::open(&mut self.arena, from)?;
        let node = source.detach(from_index)?;
        let source_key = source.key();

        let target = match from.relation_to(to) {
            PathRelation::Ancestor => to.rebase_after_removal(from, from_index).ok_or_else(|| {
                DomainError::MoveIntoOwnSubtree {
                    node: moved.clone(),
                    target: to.clone(),
                }
            })?,
            _ => to.clone(),
        };
        debug!(
            "relocating {} -> {}[{}] (reported {}, {:?})",
            moved,
            target,
            to_index,
            to,
            from.relation_to(to)
        );

        let mut destination = GroupController::open(&mut self.arena, &target)?;
        destination.attach(to_index, node)?;
        let destination_key = destination.key();

        self.touch(source_key);
        self.touch(destination_key);
        Ok(())
    }

    fn touch(&mut self, key: Index) {
        if !self.touched.contains(&key) {
            self.touched.push(key);
        }
    }

    /// Propagate every touched group to the root and materialize the result.
    #[instrument(level = "debug", skip(self))]
    pub fn finish(self) -> EngineResult<Emission<V>> {
        if let Some(max) = self.max_depth {
            let depth = self.arena.depth();
            if depth > max {
                return Err(DomainError::DepthExceeded { depth, max }.into());
            }
        }

        // Every group on the chain from a touched group to the root re-emits
        // its children, each group once.
        let mut chain: HashSet<GroupPath> = HashSet::new();
        for key in &self.touched {
            let Some(mut path) = self.arena.locate(*key) else {
                continue;
            };
            loop {
                let parent = path.parent();
                chain.insert(path);
                match parent {
                    Some(p) => path = p,
                    None => break,
                }
            }
        }

        let updates = chain
            .into_iter()
            .sorted_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)))
            .filter_map(|path| {
                let key = self.arena.resolve(&path).ok()?;
                let group = self.arena.group_value(key)?;
                Some(GroupUpdate { path, group })
            })
            .collect::<Vec<_>>();

        let tree = self.arena.to_rule_set()?;
        debug!("assembled root after {} group updates", updates.len());
        Ok(Emission { updates, tree })
    }
}

/// A node cannot be moved into itself or below itself.
fn check_not_own_subtree(from: &GroupPath, from_index: usize, to: &GroupPath) -> DomainResult<()> {
    let moved = from.child(from_index);
    if moved == *to || moved.is_ancestor_of(to) {
        return Err(DomainError::MoveIntoOwnSubtree {
            node: moved,
            target: to.clone(),
        });
    }
    Ok(())
}

/// Apply one gesture to `tree` and return the new tree.
///
/// Pure: `tree` is not modified and the result shares nothing with it.
pub fn apply_gesture<V>(tree: &RuleSet<V>, gesture: &Gesture<V>) -> EngineResult<RuleSet<V>>
where
    V: Clone + PartialEq + std::fmt::Debug,
{
    let mut assembler = RootAssembler::new(tree);
    assembler.apply(gesture)?;
    Ok(assembler.finish()?.tree)
}

/// Apply gestures in order, all or nothing.
pub fn apply_gestures<V>(tree: &RuleSet<V>, gestures: &[Gesture<V>]) -> EngineResult<RuleSet<V>>
where
    V: Clone + PartialEq + std::fmt::Debug,
{
    let mut assembler = RootAssembler::new(tree);
    for gesture in gestures {
        assembler.apply(gesture)?;
    }
    Ok(assembler.finish()?.tree)
}
