//! Group addressing by child-index path.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Location of a group as the child indices walked from the root.
///
/// The empty path addresses the root group itself. Paths are only meaningful
/// against the tree they were computed from: removing a node can shift the
/// paths of its later siblings' subtrees (see [`GroupPath::rebase_after_removal`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPath(Vec<usize>);

/// How one path relates to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelation {
    Same,
    /// `self` is a proper ancestor of the other path
    Ancestor,
    /// `self` is a proper descendant of the other path
    Descendant,
    Unrelated,
}

impl GroupPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<usize>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<GroupPath> {
        if self.is_root() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> GroupPath {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    /// Last segment, i.e. the index of this group inside its parent.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// True if `self` is a proper prefix of `other`.
    pub fn is_ancestor_of(&self, other: &GroupPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    pub fn relation_to(&self, other: &GroupPath) -> PathRelation {
        if self == other {
            PathRelation::Same
        } else if self.is_ancestor_of(other) {
            PathRelation::Ancestor
        } else if other.is_ancestor_of(self) {
            PathRelation::Descendant
        } else {
            PathRelation::Unrelated
        }
    }

    /// Re-express this path against the tree left after removing child
    /// `removed_index` of group `removed_from`.
    ///
    /// Only paths running through `removed_from` into a later sibling change:
    /// their segment at the removal depth drops by one. Returns `None` when the
    /// path runs through the removed node itself.
    pub fn rebase_after_removal(
        &self,
        removed_from: &GroupPath,
        removed_index: usize,
    ) -> Option<GroupPath> {
        if !removed_from.is_ancestor_of(self) {
            return Some(self.clone());
        }
        let depth = removed_from.depth();
        let segment = self.0[depth];
        if segment == removed_index {
            return None;
        }
        let mut segments = self.0.clone();
        if segment > removed_index {
            segments[depth] -= 1;
        }
        Some(Self(segments))
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.iter().join("/"))
    }
}

impl FromStr for GroupPath {
    type Err = DomainError;

    /// Parses `/`, `` (root), `/0/3` or `0/3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                segment
                    .parse::<usize>()
                    .map_err(|_| DomainError::InvalidPath(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<usize>> for GroupPath {
    fn from(segments: Vec<usize>) -> Self {
        Self(segments)
    }
}
