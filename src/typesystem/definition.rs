use serde::{Deserialize, Serialize};

use crate::expression::Expression;

/// A declared object type: its name plus its ordered relations and
/// permissions. Order is preserved from the schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl NamespaceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
        }
    }

    pub fn with_relations(name: impl Into<String>, relations: Vec<RelationDefinition>) -> Self {
        Self {
            name: name.into(),
            relations,
        }
    }

    pub fn relation(mut self, definition: RelationDefinition) -> Self {
        self.relations.push(definition);
        self
    }
}

/// One relation or permission of a namespace. A definition without a
/// rewrite stores relationships directly; one with a rewrite is a
/// permission computed from its expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    /// Namespaces whose objects may appear as subjects of this relation.
    /// Empty for permissions and for relations the schema leaves open.
    #[serde(default)]
    pub allowed_subject_types: Vec<String>,
    #[serde(default)]
    pub rewrite: Option<Expression>,
}

impl RelationDefinition {
    /// A stored relation: a leaf in the expression algebra.
    pub fn relation(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_subject_types: Vec::new(),
            rewrite: None,
        }
    }

    /// A permission computed from `rewrite`.
    pub fn permission(name: impl Into<String>, rewrite: Expression) -> Self {
        Self {
            name: name.into(),
            allowed_subject_types: Vec::new(),
            rewrite: Some(rewrite),
        }
    }

    pub fn with_subject_types<I, S>(mut self, subject_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_subject_types = subject_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_permission(&self) -> bool {
        self.rewrite.is_some()
    }
}
