//! Move reconciler
//!
//! A drag that crosses a group boundary is reported as a `removed` on the
//! source group and an `added` on the destination group, in either order and
//! possibly on different turns. The reconciler buffers these halves for one
//! reconciliation cycle and settles them into [`SettledEdit`]s:
//!
//! - a `removed`/`added` pair carrying equal elements becomes one relocation;
//! - a solitary half becomes a partial edit (removal or insertion);
//! - a `moved` needs no pairing and becomes a [`Gesture::Reorder`] straight away.
//!
//! Settled edits keep the paths and indices as reported, i.e. against the tree
//! at the start of the cycle. The assembler resolves them all to arena keys
//! before it changes anything (see [`crate::application::assembler`]).

use tracing::{debug, instrument};

use crate::application::events::{ChangeEvent, Notification};
use crate::application::gesture::Gesture;
use crate::domain::{GroupPath, QueryNode};

/// Edit produced when a cycle closes.
///
/// Paths and indices refer to the tree as it was when the cycle started,
/// `element` is what the drag collaborator reported.
#[derive(Debug, Clone, PartialEq)]
pub enum SettledEdit<V> {
    /// Paired halves; `to_index` counts in the destination after the removal.
    Relocate {
        from: GroupPath,
        from_index: usize,
        to: GroupPath,
        to_index: usize,
        element: QueryNode<V>,
    },
    /// Lone `removed` half
    Remove {
        group: GroupPath,
        index: usize,
        element: QueryNode<V>,
    },
    /// Lone `added` half
    Insert {
        group: GroupPath,
        index: usize,
        element: QueryNode<V>,
    },
}

impl<V: Clone> SettledEdit<V> {
    /// The equivalent stand-alone gesture, e.g. for logging or scripting.
    pub fn to_gesture(&self) -> Gesture<V> {
        match self {
            Self::Relocate {
                from,
                from_index,
                to,
                to_index,
                ..
            } => Gesture::relocate(from.clone(), *from_index, to.clone(), *to_index),
            Self::Remove { group, index, .. } => Gesture::Remove {
                group: group.clone(),
                index: *index,
            },
            Self::Insert {
                group,
                index,
                element,
            } => Gesture::Insert {
                group: group.clone(),
                index: *index,
                node: element.clone(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Pending<V> {
    seq: usize,
    group: GroupPath,
    index: usize,
    element: QueryNode<V>,
}

/// Buffers the halves of cross-group moves until the cycle ends.
#[derive(Debug, Clone)]
pub struct MoveReconciler<V> {
    removed: Vec<Pending<V>>,
    added: Vec<Pending<V>>,
    seq: usize,
}

impl<V> Default for MoveReconciler<V> {
    fn default() -> Self {
        Self {
            removed: Vec::new(),
            added: Vec::new(),
            seq: 0,
        }
    }
}

impl<V: Clone + PartialEq> MoveReconciler<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one notification.
    ///
    /// Returns the gesture immediately when the event is complete on its own
    /// (`moved`); `removed`/`added` halves are held until [`Self::settle`].
    #[instrument(level = "debug", skip_all, fields(group = %notification.group))]
    pub fn observe(&mut self, notification: Notification<V>) -> Option<Gesture<V>> {
        let Notification { group, event } = notification;
        self.seq += 1;
        match event {
            ChangeEvent::Moved(moved) => {
                Some(Gesture::reorder(group, moved.old_index, moved.new_index))
            }
            ChangeEvent::Removed(removed) => {
                debug!("holding removed half from {}[{}]", group, removed.old_index);
                self.removed.push(Pending {
                    seq: self.seq,
                    group,
                    index: removed.old_index,
                    element: removed.element,
                });
                None
            }
            ChangeEvent::Added(added) => {
                debug!("holding added half for {}[{}]", group, added.new_index);
                self.added.push(Pending {
                    seq: self.seq,
                    group,
                    index: added.new_index,
                    element: added.element,
                });
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }

    /// Discard all buffered halves.
    pub fn clear(&mut self) {
        self.removed.clear();
        self.added.clear();
    }

    /// Close the cycle: pair buffered halves and return the resulting edits
    /// in the order their first half was observed.
    #[instrument(level = "debug", skip(self))]
    pub fn settle(&mut self) -> Vec<SettledEdit<V>> {
        let mut added: Vec<Option<Pending<V>>> = self.added.drain(..).map(Some).collect();
        let mut edits: Vec<(usize, SettledEdit<V>)> = Vec::new();

        for removed in self.removed.drain(..) {
            let partner = added
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|a| a.element == removed.element))
                .and_then(Option::take);
            match partner {
                Some(added) => {
                    debug!(
                        "paired {}[{}] -> {}[{}] ({:?})",
                        removed.group,
                        removed.index,
                        added.group,
                        added.index,
                        added.group.relation_to(&removed.group)
                    );
                    edits.push((
                        removed.seq.min(added.seq),
                        SettledEdit::Relocate {
                            from: removed.group,
                            from_index: removed.index,
                            to: added.group,
                            to_index: added.index,
                            element: removed.element,
                        },
                    ));
                }
                None => {
                    debug!("unpaired removed half at {}[{}]", removed.group, removed.index);
                    edits.push((
                        removed.seq,
                        SettledEdit::Remove {
                            group: removed.group,
                            index: removed.index,
                            element: removed.element,
                        },
                    ));
                }
            }
        }

        for added in added.into_iter().flatten() {
            debug!("unpaired added half at {}[{}]", added.group, added.index);
            edits.push((
                added.seq,
                SettledEdit::Insert {
                    group: added.group,
                    index: added.index,
                    element: added.element,
                },
            ));
        }

        edits.sort_by_key(|(seq, _)| *seq);
        edits.into_iter().map(|(_, edit)| edit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rule(value: &str) -> QueryNode<Value> {
        QueryNode::rule("txt", json!(value))
    }

    fn path(segments: &[usize]) -> GroupPath {
        GroupPath::new(segments.to_vec())
    }

    #[test]
    fn test_moved_is_emitted_immediately() {
        let mut reconciler = MoveReconciler::new();
        let moved = Notification::new(path(&[0]), ChangeEvent::moved(rule("D"), 0, 2));
        let gesture = reconciler.observe(moved);
        assert_eq!(gesture, Some(Gesture::reorder(path(&[0]), 0, 2)));
        assert!(!reconciler.is_pending());
    }

    #[test]
    fn test_pairs_halves_in_either_order() {
        for reversed in [false, true] {
            let mut reconciler = MoveReconciler::new();
            let removed = Notification::new(path(&[0]), ChangeEvent::removed(rule("B"), 1));
            let added = Notification::new(path(&[1]), ChangeEvent::added(rule("B"), 3));
            let (first, second) = if reversed { (added, removed) } else { (removed, added) };
            assert!(reconciler.observe(first).is_none());
            assert!(reconciler.observe(second).is_none());
            assert_eq!(
                reconciler.settle(),
                vec![SettledEdit::Relocate {
                    from: path(&[0]),
                    from_index: 1,
                    to: path(&[1]),
                    to_index: 3,
                    element: rule("B"),
                }]
            );
            assert!(!reconciler.is_pending());
        }
    }

    #[test]
    fn test_unmatched_elements_stay_partial() {
        let mut reconciler = MoveReconciler::new();
        reconciler.observe(Notification::new(path(&[0]), ChangeEvent::removed(rule("B"), 1)));
        reconciler.observe(Notification::new(path(&[1]), ChangeEvent::added(rule("Q"), 0)));
        let gestures: Vec<Gesture<Value>> =
            reconciler.settle().iter().map(SettledEdit::to_gesture).collect();
        assert_eq!(
            gestures,
            vec![
                Gesture::Remove {
                    group: path(&[0]),
                    index: 1
                },
                Gesture::Insert {
                    group: path(&[1]),
                    index: 0,
                    node: rule("Q")
                },
            ]
        );
    }

    #[test]
    fn test_settled_order_follows_first_half() {
        let mut reconciler = MoveReconciler::new();
        reconciler.observe(Notification::new(path(&[0]), ChangeEvent::added(rule("Q"), 0)));
        reconciler.observe(Notification::new(path(&[0]), ChangeEvent::removed(rule("B"), 1)));
        let settled = reconciler.settle();
        assert!(matches!(settled[0], SettledEdit::Insert { index: 0, .. }));
        assert!(matches!(settled[1], SettledEdit::Remove { index: 1, .. }));
    }
}
