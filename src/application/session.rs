//! Query builder session
//!
//! Controlled-value wrapper the owning application talks to. The owner mounts
//! the builder with its registries and current tree; every completed gesture
//! yields exactly one [`Emission`] whose tree becomes the new value.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::application::assembler::RootAssembler;
use crate::application::error::{EngineError, EngineResult};
use crate::application::events::{ChangeEvent, Emission, Notification};
use crate::application::gesture::Gesture;
use crate::application::reconciler::MoveReconciler;
use crate::domain::{DomainError, GroupPath, QueryBuilderConfig, QueryNode, RuleSet, RuleValue};

/// One mounted query builder.
#[derive(Debug)]
pub struct QueryBuilder<V = RuleValue> {
    config: QueryBuilderConfig<V>,
    value: RuleSet<V>,
    reconciler: MoveReconciler<V>,
}

impl<V> QueryBuilder<V>
where
    V: Clone + PartialEq + fmt::Debug,
{
    /// Mount the builder; registries and tree are validated here and never
    /// during drag handling.
    #[instrument(level = "debug", skip_all)]
    pub fn mount(config: QueryBuilderConfig<V>, value: RuleSet<V>) -> EngineResult<Self> {
        config.validate_definitions()?;
        config.validate_tree(&value)?;
        if config.dragging.is_none() {
            debug!("no drag options configured, using defaults");
        }
        info!(
            "mounted query builder: {} rules, depth {}",
            value.rule_count(),
            value.depth()
        );
        Ok(Self {
            config,
            value,
            reconciler: MoveReconciler::new(),
        })
    }

    pub fn config(&self) -> &QueryBuilderConfig<V> {
        &self.config
    }

    /// Current authoritative tree.
    pub fn value(&self) -> &RuleSet<V> {
        &self.value
    }

    /// Owner re-supplies the value; any half-reported move is dropped.
    pub fn set_value(&mut self, value: RuleSet<V>) -> EngineResult<()> {
        self.config.validate_tree(&value)?;
        if self.reconciler.is_pending() {
            warn!("value replaced while a move was pending, discarding it");
            self.reconciler.clear();
        }
        self.value = value;
        Ok(())
    }

    /// Deliver one drag notification observed by the group at `group`.
    ///
    /// A `moved` event is complete on its own and emits immediately. The
    /// halves of a cross-group move are held until [`Self::end_cycle`].
    #[instrument(level = "debug", skip(self, event))]
    pub fn notify(
        &mut self,
        group: GroupPath,
        event: ChangeEvent<V>,
    ) -> EngineResult<Option<Emission<V>>> {
        if !self.config.drag_enabled() {
            return Err(EngineError::DragDisabled);
        }
        match self.reconciler.observe(Notification::new(group, event)) {
            Some(gesture) => self.commit(&[gesture]).map(Some),
            None => Ok(None),
        }
    }

    /// Turn boundary: pair what was reported during the cycle and emit once.
    ///
    /// Returns `None` when nothing was pending.
    #[instrument(level = "debug", skip(self))]
    pub fn end_cycle(&mut self) -> EngineResult<Option<Emission<V>>> {
        if !self.reconciler.is_pending() {
            return Ok(None);
        }
        let edits = self.reconciler.settle();
        debug!("cycle settled into {} edit(s)", edits.len());
        self.assemble(|assembler| assembler.apply_settled(&edits)).map(Some)
    }

    /// Apply one atomic gesture.
    ///
    /// Nodes and operators the gesture introduces are checked against the
    /// registries; nodes that only move around are not.
    pub fn apply(&mut self, gesture: Gesture<V>) -> EngineResult<Emission<V>> {
        self.check_introduced_identifiers(&gesture)?;
        self.commit(&[gesture])
    }

    /// Append a rule of a registered type, seeded with its initial value.
    pub fn add_rule(&mut self, group: &GroupPath, identifier: &str) -> EngineResult<Emission<V>> {
        let rule = self.config.new_rule(identifier)?;
        let index = self.child_count(group)?;
        self.commit(&[Gesture::Insert {
            group: group.clone(),
            index,
            node: rule.into(),
        }])
    }

    /// Append an empty sub-group; defaults to the first registered operator.
    pub fn add_group(
        &mut self,
        group: &GroupPath,
        operator: Option<&str>,
    ) -> EngineResult<Emission<V>> {
        let new_group = self.config.new_group(operator)?;
        let index = self.child_count(group)?;
        self.commit(&[Gesture::Insert {
            group: group.clone(),
            index,
            node: new_group.into(),
        }])
    }

    /// Insert an externally built node after checking its identifiers.
    pub fn insert(
        &mut self,
        group: &GroupPath,
        index: usize,
        node: QueryNode<V>,
    ) -> EngineResult<Emission<V>> {
        self.apply(Gesture::Insert {
            group: group.clone(),
            index,
            node,
        })
    }

    pub fn remove(&mut self, group: &GroupPath, index: usize) -> EngineResult<Emission<V>> {
        self.commit(&[Gesture::Remove {
            group: group.clone(),
            index,
        }])
    }

    pub fn set_operator(&mut self, group: &GroupPath, operator: &str) -> EngineResult<Emission<V>> {
        self.apply(Gesture::SetOperator {
            group: group.clone(),
            operator: operator.to_string(),
        })
    }

    pub fn set_rule_value(
        &mut self,
        group: &GroupPath,
        index: usize,
        value: V,
    ) -> EngineResult<Emission<V>> {
        self.commit(&[Gesture::SetValue {
            group: group.clone(),
            index,
            value,
        }])
    }

    fn child_count(&self, group: &GroupPath) -> EngineResult<usize> {
        self.value
            .group_at(group)
            .map(|g| g.children.len())
            .ok_or_else(|| DomainError::GroupNotFound(group.clone()).into())
    }

    fn check_introduced_identifiers(&self, gesture: &Gesture<V>) -> EngineResult<()> {
        match gesture {
            Gesture::SetOperator { operator, .. } if self.config.operator(operator).is_none() => {
                Err(DomainError::UnknownOperator(operator.clone()).into())
            }
            Gesture::Insert { node, .. } => Ok(self.config.validate_node(node)?),
            _ => Ok(()),
        }
    }

    fn commit(&mut self, gestures: &[Gesture<V>]) -> EngineResult<Emission<V>> {
        self.assemble(|assembler| gestures.iter().try_for_each(|g| assembler.apply(g)))
    }

    /// Run `edit` on a fresh working copy; only a complete success replaces
    /// the value.
    fn assemble(
        &mut self,
        edit: impl FnOnce(&mut RootAssembler<V>) -> EngineResult<()>,
    ) -> EngineResult<Emission<V>> {
        let mut assembler = RootAssembler::new(&self.value).with_max_depth(self.config.max_depth);
        edit(&mut assembler)?;
        let emission = assembler.finish()?;
        self.value = emission.tree.clone();
        debug!("emitted new tree with {} group update(s)", emission.updates.len());
        Ok(emission)
    }
}
