use std::collections::HashMap;

use super::definition::NamespaceDefinition;

/// Read-only lookup of namespace definitions: the seam to whatever holds
/// the schema (a datastore snapshot in the full system).
pub trait TypeResolver {
    fn lookup_definition(&self, namespace: &str) -> Option<&NamespaceDefinition>;
}

/// Resolver over a fixed, in-memory set of definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    definitions: HashMap<String, NamespaceDefinition>,
}

impl StaticResolver {
    pub fn new(definitions: impl IntoIterator<Item = NamespaceDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|definition| (definition.name.clone(), definition))
                .collect(),
        }
    }
}

impl TypeResolver for StaticResolver {
    fn lookup_definition(&self, namespace: &str) -> Option<&NamespaceDefinition> {
        self.definitions.get(namespace)
    }
}
