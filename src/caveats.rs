use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named caveat applied with a concrete evaluation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualizedCaveat {
    pub caveat_name: String,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl ContextualizedCaveat {
    pub fn named(caveat_name: impl Into<String>) -> Self {
        Self {
            caveat_name: caveat_name.into(),
            context: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaveatOperator {
    Or,
    And,
    Subtract,
}

/// A caveat expression tree: a single contextualized caveat, or an
/// operation over child expressions. Equality is structural; evaluation
/// belongs to higher layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaveatExpression {
    Caveat(ContextualizedCaveat),
    Operation {
        op: CaveatOperator,
        children: Vec<CaveatExpression>,
    },
}

impl CaveatExpression {
    pub fn named(caveat_name: impl Into<String>) -> Self {
        CaveatExpression::Caveat(ContextualizedCaveat::named(caveat_name))
    }

    /// The underlying caveat when this expression is a simple leaf.
    pub fn as_caveat(&self) -> Option<&ContextualizedCaveat> {
        match self {
            CaveatExpression::Caveat(caveat) => Some(caveat),
            CaveatExpression::Operation { .. } => None,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, CaveatExpression::Caveat(_))
    }
}

fn operation(op: CaveatOperator, children: Vec<CaveatExpression>) -> CaveatExpression {
    CaveatExpression::Operation { op, children }
}

/// OR of two optional caveats. An absent operand means "unconditional";
/// OR and AND collapse to the present operand.
pub fn or(a: Option<CaveatExpression>, b: Option<CaveatExpression>) -> Option<CaveatExpression> {
    match (a, b) {
        (Some(a), Some(b)) => Some(operation(CaveatOperator::Or, vec![a, b])),
        (Some(present), None) | (None, Some(present)) => Some(present),
        (None, None) => None,
    }
}

/// AND of two optional caveats; collapses like [`or`].
pub fn and(a: Option<CaveatExpression>, b: Option<CaveatExpression>) -> Option<CaveatExpression> {
    match (a, b) {
        (Some(a), Some(b)) => Some(operation(CaveatOperator::And, vec![a, b])),
        (Some(present), None) | (None, Some(present)) => Some(present),
        (None, None) => None,
    }
}

/// Subtraction of `b` from `a`. Subtracting from an absent minuend yields
/// the unary negation of the subtrahend, never an absent result: the
/// subtracted condition must survive the merge.
pub fn subtract(
    a: Option<CaveatExpression>,
    b: Option<CaveatExpression>,
) -> Option<CaveatExpression> {
    match (a, b) {
        (Some(a), Some(b)) => Some(operation(CaveatOperator::Subtract, vec![a, b])),
        (minuend, None) => minuend,
        (None, Some(b)) => Some(operation(CaveatOperator::Subtract, vec![b])),
    }
}
