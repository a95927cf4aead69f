/*
Workaround for error: https://doc.rust-lang.org/error_codes/E0116.html
Cannot define inherent `impl` for a type outside of the crate where the type is defined

define a trait that has the desired associated functions/types/constants and implement the trait for the type in question
 */
use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{QueryNode, RuleSet};

pub trait ToTermTree {
    fn to_term_tree(&self) -> Tree<String>;
}

impl<V: Display> ToTermTree for RuleSet<V> {
    #[instrument(level = "trace", skip_all)]
    fn to_term_tree(&self) -> Tree<String> {
        let leaves: Vec<_> = self.children.iter().map(|c| c.to_term_tree()).collect();
        Tree::new(self.operator_identifier.clone()).with_leaves(leaves)
    }
}

impl<V: Display> ToTermTree for QueryNode<V> {
    fn to_term_tree(&self) -> Tree<String> {
        match self {
            QueryNode::Rule(rule) => Tree::new(format!("{}: {}", rule.identifier, rule.value)),
            QueryNode::Group(group) => group.to_term_tree(),
        }
    }
}
