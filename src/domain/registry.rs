//! Operator and rule-type registries supplied by the owning application.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::entities::{OperatorId, QueryNode, Rule, RuleSet, RuleTypeId, RuleValue};
use crate::domain::error::{DomainError, DomainResult};

/// Operator a group can combine its children with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDefinition {
    pub identifier: OperatorId,
    pub name: String,
}

/// Rule type: the engine only needs the identifier and the initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition<V = RuleValue> {
    pub identifier: RuleTypeId,
    pub name: String,
    pub initial_value: V,
}

/// Drag tuning passed through to the drag collaborator.
///
/// Only `disabled` is honoured by the engine; the rest is presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragOptions {
    /// Animation duration in milliseconds
    pub animation: Option<u32>,
    pub disabled: bool,
    pub ghost_class: Option<String>,
}

/// Everything a query builder is mounted with besides the tree value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBuilderConfig<V = RuleValue> {
    pub operators: Vec<OperatorDefinition>,
    pub rules: Vec<RuleDefinition<V>>,
    #[serde(default)]
    pub dragging: Option<DragOptions>,
    /// Maximum group nesting depth, root included
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl OperatorDefinition {
    pub fn new(identifier: impl Into<OperatorId>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
        }
    }
}

impl<V> RuleDefinition<V> {
    pub fn new(
        identifier: impl Into<RuleTypeId>,
        name: impl Into<String>,
        initial_value: V,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            initial_value,
        }
    }
}

impl<V> QueryBuilderConfig<V> {
    /// Config with registries only; no drag tuning and no depth limit.
    pub fn new(operators: Vec<OperatorDefinition>, rules: Vec<RuleDefinition<V>>) -> Self {
        Self {
            operators,
            rules,
            dragging: None,
            max_depth: None,
        }
    }

    pub fn with_dragging(mut self, dragging: DragOptions) -> Self {
        self.dragging = Some(dragging);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn operator(&self, identifier: &str) -> Option<&OperatorDefinition> {
        self.operators.iter().find(|op| op.identifier == identifier)
    }

    pub fn rule(&self, identifier: &str) -> Option<&RuleDefinition<V>> {
        self.rules.iter().find(|rule| rule.identifier == identifier)
    }

    /// Missing drag options leave dragging enabled.
    pub fn drag_enabled(&self) -> bool {
        !self.dragging.as_ref().is_some_and(|d| d.disabled)
    }

    /// Check the registries themselves: at least one operator, no duplicates.
    pub fn validate_definitions(&self) -> DomainResult<()> {
        if self.operators.is_empty() {
            return Err(DomainError::NoOperators);
        }
        let mut seen = HashSet::new();
        for id in self.operators.iter().map(|op| &op.identifier) {
            if !seen.insert(id) {
                return Err(DomainError::DuplicateDefinition(format!("operator {id}")));
            }
        }
        seen.clear();
        for id in self.rules.iter().map(|rule| &rule.identifier) {
            if !seen.insert(id) {
                return Err(DomainError::DuplicateDefinition(format!("rule {id}")));
            }
        }
        Ok(())
    }

    /// Check that every operator and rule identifier in `tree` is registered.
    #[instrument(level = "debug", skip_all)]
    pub fn validate_tree(&self, tree: &RuleSet<V>) -> DomainResult<()> {
        if self.operator(&tree.operator_identifier).is_none() {
            return Err(DomainError::UnknownOperator(tree.operator_identifier.clone()));
        }
        for child in &tree.children {
            self.validate_node(child)?;
        }
        debug!(
            "tree validated against {} operators and {} rule types",
            self.operators.len(),
            self.rules.len()
        );
        Ok(())
    }

    pub fn validate_node(&self, node: &QueryNode<V>) -> DomainResult<()> {
        match node {
            QueryNode::Rule(rule) if self.rule(&rule.identifier).is_none() => {
                Err(DomainError::UnknownRuleIdentifier(rule.identifier.clone()))
            }
            QueryNode::Rule(_) => Ok(()),
            QueryNode::Group(group) => self.validate_tree(group),
        }
    }
}

impl<V: Clone> QueryBuilderConfig<V> {
    /// New rule of a registered type, seeded with the type's initial value.
    pub fn new_rule(&self, identifier: &str) -> DomainResult<Rule<V>> {
        let definition = self
            .rule(identifier)
            .ok_or_else(|| DomainError::UnknownRuleIdentifier(identifier.to_string()))?;
        Ok(Rule::new(
            definition.identifier.clone(),
            definition.initial_value.clone(),
        ))
    }

    /// New empty group; without an explicit operator the first registered one is used.
    pub fn new_group(&self, operator: Option<&str>) -> DomainResult<RuleSet<V>> {
        let definition = match operator {
            Some(id) => self
                .operator(id)
                .ok_or_else(|| DomainError::UnknownOperator(id.to_string()))?,
            None => self.operators.first().ok_or(DomainError::NoOperators)?,
        };
        Ok(RuleSet::new(definition.identifier.clone()))
    }
}

impl Default for QueryBuilderConfig<RuleValue> {
    fn default() -> Self {
        Self::new(
            vec![
                OperatorDefinition::new("AND", "AND"),
                OperatorDefinition::new("OR", "OR"),
            ],
            vec![
                RuleDefinition::new("txt", "Text Selection", RuleValue::from("")),
                RuleDefinition::new("num", "Number Selection", RuleValue::from(10)),
            ],
        )
    }
}
