use serde::{Deserialize, Serialize};

/// A permission expression over the relations of one namespace.
///
/// Semantics are set-algebraic:
/// - `Union` and `Intersection` are commutative and associative.
/// - `Exclusion` is left-associative and non-commutative: the n-ary form
///   `Exclusion([a, b, c])` reads `(a - b) - c`.
/// - `Nil` is the empty set, but is not erased by canonicalization: it
///   carries provenance meaning in the surrounding system.
/// - `Rewrite` wraps a nested operator and contributes nothing of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// The relation's directly stored relationships.
    This,
    /// The empty set.
    Nil,
    /// Reference to another relation or permission in the same namespace.
    ComputedRelation { name: String },
    /// Walk `tupleset`, then compute `computed` on each reached object.
    TupleToRelation { tupleset: String, computed: String },
    /// Transparent wrapper around a nested operator.
    Rewrite(Box<Expression>),
    Union(Vec<Expression>),
    Intersection(Vec<Expression>),
    Exclusion(Vec<Expression>),
}

impl Expression {
    pub fn computed(name: impl Into<String>) -> Expression {
        Expression::ComputedRelation { name: name.into() }
    }

    pub fn arrow(tupleset: impl Into<String>, computed: impl Into<String>) -> Expression {
        Expression::TupleToRelation {
            tupleset: tupleset.into(),
            computed: computed.into(),
        }
    }

    pub fn rewrite(inner: Expression) -> Expression {
        Expression::Rewrite(Box::new(inner))
    }

    pub fn union(children: Vec<Expression>) -> Expression {
        Expression::Union(children)
    }

    pub fn intersection(children: Vec<Expression>) -> Expression {
        Expression::Intersection(children)
    }

    pub fn exclusion(children: Vec<Expression>) -> Expression {
        Expression::Exclusion(children)
    }

    /// Strips any number of rewrite wrappers.
    pub fn unwrapped(&self) -> &Expression {
        let mut current = self;
        while let Expression::Rewrite(inner) = current {
            current = inner;
        }
        current
    }

    /// The referenced name when this expression is nothing but a single bare
    /// reference: a `ComputedRelation`, or a one-child `Union` around one.
    /// Rewrite wrappers are transparent.
    pub fn as_single_reference(&self) -> Option<&str> {
        match self.unwrapped() {
            Expression::ComputedRelation { name } => Some(name),
            Expression::Union(children) if children.len() == 1 => {
                match children[0].unwrapped() {
                    Expression::ComputedRelation { name } => Some(name),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Maximum nesting depth of this expression tree, counting rewrite
    /// wrappers. Used to bound recursion on untrusted schemas.
    pub fn depth(&self) -> usize {
        match self {
            Expression::This
            | Expression::Nil
            | Expression::ComputedRelation { .. }
            | Expression::TupleToRelation { .. } => 1,
            Expression::Rewrite(inner) => 1 + inner.depth(),
            Expression::Union(children)
            | Expression::Intersection(children)
            | Expression::Exclusion(children) => {
                1 + children.iter().map(Expression::depth).max().unwrap_or(0)
            }
        }
    }
}
