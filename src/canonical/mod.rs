mod aliases;
mod keys;

pub use aliases::{compute_permission_aliases, AliasMap};
pub use keys::{compute_canonical_cache_keys, CanonicalKeyMap, COMPUTED_KEY_PREFIX};
