/// Validation limits applied when a namespace definition is admitted into a
/// `ValidatedTypeSystem`. Canonicalization itself takes no configuration:
/// its token grammar and hash are part of the durable cache-key contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSystemConfig {
    /// Maximum nesting depth of a permission expression, counting rewrite
    /// wrappers. Bounds recursion during validation and canonicalization.
    pub max_expression_depth: usize,
    /// Maximum number of relations and permissions in one namespace.
    pub max_relations_per_namespace: usize,
}

impl Default for TypeSystemConfig {
    fn default() -> Self {
        Self {
            max_expression_depth: 32,
            max_relations_per_namespace: 256,
        }
    }
}
