//! Domain entities: the query tree value handed between owner and engine

use serde::{Deserialize, Serialize};

use crate::domain::path::GroupPath;

/// Identifier of an operator definition, e.g. `"AND"`.
pub type OperatorId = String;

/// Identifier of a rule-type definition, e.g. `"txt"`.
pub type RuleTypeId = String;

/// Default payload of a rule. Opaque to the engine.
pub type RuleValue = serde_json::Value;

/// Leaf of the query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule<V = RuleValue> {
    /// Selects the rule-type definition in the registry
    pub identifier: RuleTypeId,
    pub value: V,
}

/// Group of children combined by one operator (a.k.a. RuleSet).
///
/// The order of `children` is the displayed and evaluated order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet<V = RuleValue> {
    pub operator_identifier: OperatorId,
    #[serde(default = "Vec::new")]
    pub children: Vec<QueryNode<V>>,
}

/// A node of the query tree: either a rule or a nested group.
///
/// The variant is fixed at construction. On the wire a node is either
/// `{identifier, value}` or `{operatorIdentifier, children}`; a group is tried
/// first since it is the only shape carrying `operatorIdentifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryNode<V = RuleValue> {
    Group(RuleSet<V>),
    Rule(Rule<V>),
}

impl<V> Rule<V> {
    pub fn new(identifier: impl Into<RuleTypeId>, value: V) -> Self {
        Self {
            identifier: identifier.into(),
            value,
        }
    }
}

impl<V> RuleSet<V> {
    pub fn new(operator_identifier: impl Into<OperatorId>) -> Self {
        Self {
            operator_identifier: operator_identifier.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<QueryNode<V>>) -> Self {
        self.children = children;
        self
    }

    /// Look up a nested group by path; the empty path yields `self`.
    pub fn group_at(&self, path: &GroupPath) -> Option<&RuleSet<V>> {
        path.segments()
            .iter()
            .try_fold(self, |group, &index| group.children.get(index)?.as_group())
    }

    pub fn group_at_mut(&mut self, path: &GroupPath) -> Option<&mut RuleSet<V>> {
        path.segments()
            .iter()
            .try_fold(self, |group, &index| group.children.get_mut(index)?.as_group_mut())
    }

    /// Group nesting depth: a group without sub-groups has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(QueryNode::as_group)
            .map(RuleSet::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of rules in the whole subtree.
    pub fn rule_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                QueryNode::Rule(_) => 1,
                QueryNode::Group(group) => group.rule_count(),
            })
            .sum()
    }
}

impl<V> QueryNode<V> {
    pub fn rule(identifier: impl Into<RuleTypeId>, value: V) -> Self {
        Self::Rule(Rule::new(identifier, value))
    }

    pub fn group(operator_identifier: impl Into<OperatorId>, children: Vec<QueryNode<V>>) -> Self {
        Self::Group(RuleSet::new(operator_identifier).with_children(children))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn as_group(&self) -> Option<&RuleSet<V>> {
        match self {
            Self::Group(group) => Some(group),
            Self::Rule(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut RuleSet<V>> {
        match self {
            Self::Group(group) => Some(group),
            Self::Rule(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule<V>> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Group(_) => None,
        }
    }
}

impl<V> From<Rule<V>> for QueryNode<V> {
    fn from(rule: Rule<V>) -> Self {
        Self::Rule(rule)
    }
}

impl<V> From<RuleSet<V>> for QueryNode<V> {
    fn from(group: RuleSet<V>) -> Self {
        Self::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_wire_format_has_no_tag() {
        let node: QueryNode = QueryNode::group("AND", vec![QueryNode::rule("txt", json!("A"))]);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "operatorIdentifier": "AND",
                "children": [{"identifier": "txt", "value": "A"}]
            })
        );
        let back: QueryNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_group_without_children_key_is_empty() {
        let node: QueryNode = serde_json::from_value(json!({"operatorIdentifier": "OR"})).unwrap();
        assert_eq!(node, QueryNode::group("OR", vec![]));

        let tree: RuleSet = serde_json::from_value(json!({
            "operatorIdentifier": "AND",
            "children": [{"operatorIdentifier": "OR"}, {"identifier": "num", "value": 3}]
        }))
        .unwrap();
        assert_eq!(
            tree.children,
            vec![QueryNode::group("OR", vec![]), QueryNode::rule("num", json!(3))]
        );
    }

    #[test]
    fn test_object_of_neither_shape_is_rejected() {
        let result: Result<QueryNode, _> = serde_json::from_value(json!({"name": "txt"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_group_at_and_depth() {
        let tree: RuleSet = RuleSet::new("OR").with_children(vec![QueryNode::group(
            "AND",
            vec![
                QueryNode::rule("txt", json!("A")),
                QueryNode::group("AND", vec![QueryNode::rule("txt", json!("B"))]),
            ],
        )]);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.rule_count(), 2);
        assert_eq!(
            tree.group_at(&GroupPath::new(vec![0, 1])).map(|g| g.children.len()),
            Some(1)
        );
        assert!(tree.group_at(&GroupPath::new(vec![0, 0])).is_none());
        assert!(tree.group_at(&GroupPath::new(vec![5])).is_none());
    }
}
