mod definition;
mod resolver;

pub use definition::{NamespaceDefinition, RelationDefinition};
pub use resolver::{StaticResolver, TypeResolver};

use std::collections::HashSet;

use crate::config::TypeSystemConfig;
use crate::error::{NameKind, TesseraError};
use crate::expression::Expression;

const MAX_NAME_BYTES: usize = 64;

/// Relation and namespace names: lowercase ASCII letters, digits, and
/// underscores, starting with a letter and not ending with an underscore.
/// The `%` computed-key marker can therefore never collide with a name.
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_BYTES {
        return false;
    }
    if !bytes[0].is_ascii_lowercase() {
        return false;
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
    {
        return false;
    }
    bytes[bytes.len() - 1] != b'_'
}

/// A namespace definition paired with the resolver used to check its
/// cross-namespace references. Call [`TypeSystem::validate`] to obtain the
/// read-only view the canonicalizer consumes.
pub struct TypeSystem<'a> {
    definition: NamespaceDefinition,
    resolver: &'a dyn TypeResolver,
}

impl<'a> TypeSystem<'a> {
    pub fn new(definition: NamespaceDefinition, resolver: &'a dyn TypeResolver) -> Self {
        Self {
            definition,
            resolver,
        }
    }

    pub fn validate(self, config: &TypeSystemConfig) -> Result<ValidatedTypeSystem, TesseraError> {
        let namespace = &self.definition.name;
        if !is_valid_name(namespace) {
            return Err(TesseraError::InvalidName {
                kind: NameKind::Namespace,
                name: namespace.clone(),
            });
        }
        if self.definition.relations.len() > config.max_relations_per_namespace {
            return Err(TesseraError::TooManyRelations {
                namespace: namespace.clone(),
                count: self.definition.relations.len(),
                max: config.max_relations_per_namespace,
            });
        }

        let mut seen = HashSet::new();
        for relation in &self.definition.relations {
            if !is_valid_name(&relation.name) {
                return Err(TesseraError::InvalidName {
                    kind: NameKind::Relation,
                    name: relation.name.clone(),
                });
            }
            if !seen.insert(relation.name.as_str()) {
                return Err(TesseraError::DuplicateRelation {
                    namespace: namespace.clone(),
                    relation: relation.name.clone(),
                });
            }
            for subject_type in &relation.allowed_subject_types {
                let known = subject_type == namespace
                    || self.resolver.lookup_definition(subject_type).is_some();
                if !known {
                    return Err(TesseraError::UnknownSubjectType {
                        namespace: namespace.clone(),
                        relation: relation.name.clone(),
                        subject_type: subject_type.clone(),
                    });
                }
            }
            if let Some(rewrite) = &relation.rewrite {
                let depth = rewrite.depth();
                if depth > config.max_expression_depth {
                    return Err(TesseraError::ExpressionTooDeep {
                        relation: relation.name.clone(),
                        depth,
                        max: config.max_expression_depth,
                    });
                }
                validate_expression(namespace, &relation.name, rewrite)?;
            }
        }

        Ok(ValidatedTypeSystem {
            definition: self.definition,
        })
    }
}

fn validate_expression(
    namespace: &str,
    relation: &str,
    expression: &Expression,
) -> Result<(), TesseraError> {
    match expression {
        Expression::This
        | Expression::Nil
        | Expression::ComputedRelation { .. }
        | Expression::TupleToRelation { .. } => Ok(()),
        Expression::Rewrite(inner) => validate_expression(namespace, relation, inner),
        Expression::Union(children) | Expression::Intersection(children) => {
            if children.is_empty() {
                return Err(TesseraError::EmptyOperator {
                    namespace: namespace.to_string(),
                    relation: relation.to_string(),
                });
            }
            children
                .iter()
                .try_for_each(|child| validate_expression(namespace, relation, child))
        }
        Expression::Exclusion(children) => {
            if children.len() < 2 {
                return Err(TesseraError::ExclusionArity {
                    namespace: namespace.to_string(),
                    relation: relation.to_string(),
                });
            }
            children
                .iter()
                .try_for_each(|child| validate_expression(namespace, relation, child))
        }
    }
}

/// A namespace definition that passed validation. Read-only from here on;
/// safe to share across canonicalization readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTypeSystem {
    definition: NamespaceDefinition,
}

impl ValidatedTypeSystem {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Relations and permissions in schema order.
    pub fn relations(&self) -> &[RelationDefinition] {
        &self.definition.relations
    }

    pub fn get(&self, name: &str) -> Option<&RelationDefinition> {
        self.definition
            .relations
            .iter()
            .find(|relation| relation.name == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True when `name` is a stored relation, a leaf in the algebra.
    pub fn is_stored_relation(&self, name: &str) -> bool {
        self.get(name).is_some_and(|relation| !relation.is_permission())
    }

    pub fn rewrite(&self, name: &str) -> Option<&Expression> {
        self.get(name).and_then(|relation| relation.rewrite.as_ref())
    }

    pub fn definition(&self) -> &NamespaceDefinition {
        &self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::{
        is_valid_name, NamespaceDefinition, RelationDefinition, StaticResolver, TypeSystem,
    };
    use crate::config::TypeSystemConfig;
    use crate::error::TesseraErrorCode;
    use crate::expression::Expression;

    fn validate(definition: NamespaceDefinition) -> Result<(), TesseraErrorCode> {
        let resolver = StaticResolver::new([NamespaceDefinition::new("user")]);
        TypeSystem::new(definition, &resolver)
            .validate(&TypeSystemConfig::default())
            .map(|_| ())
            .map_err(|err| err.code())
    }

    #[test]
    fn name_grammar() {
        assert!(is_valid_name("viewer"));
        assert!(is_valid_name("view_all_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Viewer"));
        assert!(!is_valid_name("2viewer"));
        assert!(!is_valid_name("viewer_"));
        assert!(!is_valid_name("vie%wer"));
        assert!(!is_valid_name(&"a".repeat(65)));
    }

    #[test]
    fn accepts_well_formed_namespace_and_preserves_order() {
        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![
                RelationDefinition::relation("owner").with_subject_types(["user"]),
                RelationDefinition::relation("viewer").with_subject_types(["user", "document"]),
                RelationDefinition::permission(
                    "view",
                    Expression::union(vec![
                        Expression::computed("viewer"),
                        Expression::computed("owner"),
                    ]),
                ),
            ],
        );
        let resolver = StaticResolver::new([NamespaceDefinition::new("user")]);
        let vts = TypeSystem::new(definition, &resolver)
            .validate(&TypeSystemConfig::default())
            .expect("validate");

        let names: Vec<_> = vts.relations().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "viewer", "view"]);
        assert!(vts.is_stored_relation("owner"));
        assert!(!vts.is_stored_relation("view"));
        assert!(vts.rewrite("view").is_some());
    }

    #[test]
    fn rejects_duplicate_relations() {
        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![
                RelationDefinition::relation("owner"),
                RelationDefinition::relation("owner"),
            ],
        );
        assert_eq!(validate(definition), Err(TesseraErrorCode::DuplicateRelation));
    }

    #[test]
    fn rejects_bad_names() {
        let definition = NamespaceDefinition::with_relations(
            "Document",
            vec![RelationDefinition::relation("owner")],
        );
        assert_eq!(validate(definition), Err(TesseraErrorCode::InvalidName));

        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![RelationDefinition::relation("own er")],
        );
        assert_eq!(validate(definition), Err(TesseraErrorCode::InvalidName));
    }

    #[test]
    fn rejects_unknown_subject_types() {
        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![RelationDefinition::relation("owner").with_subject_types(["robot"])],
        );
        assert_eq!(
            validate(definition),
            Err(TesseraErrorCode::UnknownSubjectType)
        );
    }

    #[test]
    fn self_reference_subject_type_is_always_known() {
        let definition = NamespaceDefinition::with_relations(
            "group",
            vec![RelationDefinition::relation("member").with_subject_types(["group"])],
        );
        let resolver = StaticResolver::default();
        assert!(TypeSystem::new(definition, &resolver)
            .validate(&TypeSystemConfig::default())
            .is_ok());
    }

    #[test]
    fn rejects_malformed_operators() {
        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![RelationDefinition::permission(
                "view",
                Expression::union(vec![]),
            )],
        );
        assert_eq!(validate(definition), Err(TesseraErrorCode::EmptyOperator));

        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![RelationDefinition::permission(
                "view",
                Expression::exclusion(vec![Expression::computed("owner")]),
            )],
        );
        assert_eq!(validate(definition), Err(TesseraErrorCode::ExclusionArity));
    }

    #[test]
    fn rejects_over_deep_expressions() {
        let mut expr = Expression::computed("owner");
        for _ in 0..40 {
            expr = Expression::rewrite(expr);
        }
        let definition = NamespaceDefinition::with_relations(
            "document",
            vec![RelationDefinition::permission("view", expr)],
        );
        assert_eq!(
            validate(definition),
            Err(TesseraErrorCode::ExpressionTooDeep)
        );
    }

    #[test]
    fn rejects_oversized_namespaces() {
        let relations = (0..10)
            .map(|i| RelationDefinition::relation(format!("rel_{i}")))
            .collect();
        let definition = NamespaceDefinition::with_relations("document", relations);
        let resolver = StaticResolver::default();
        let config = TypeSystemConfig {
            max_relations_per_namespace: 4,
            ..TypeSystemConfig::default()
        };
        let err = TypeSystem::new(definition, &resolver)
            .validate(&config)
            .expect_err("should reject");
        assert_eq!(err.code(), TesseraErrorCode::TooManyRelations);
    }
}
