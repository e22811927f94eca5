pub mod canonical;
pub mod caveats;
pub mod config;
pub mod error;
pub mod expression;
pub mod path;
pub mod typesystem;

pub use crate::canonical::{
    compute_canonical_cache_keys, compute_permission_aliases, AliasMap, CanonicalKeyMap,
    COMPUTED_KEY_PREFIX,
};
pub use crate::caveats::{CaveatExpression, CaveatOperator, ContextualizedCaveat};
pub use crate::config::TypeSystemConfig;
pub use crate::error::{NameKind, TesseraError, TesseraErrorCode};
pub use crate::expression::Expression;
pub use crate::path::{
    IntegrityList, ObjectAndRelation, ObjectReference, Path, Relationship, RelationshipIntegrity,
};
pub use crate::typesystem::{
    NamespaceDefinition, RelationDefinition, StaticResolver, TypeResolver, TypeSystem,
    ValidatedTypeSystem,
};
