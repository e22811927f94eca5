use std::collections::BTreeMap;
use std::hash::Hasher;

use fnv::FnvHasher;
use tracing::warn;

use super::aliases::AliasMap;
use crate::expression::Expression;
use crate::typesystem::ValidatedTypeSystem;

/// Marker prefix for computed keys. `%` cannot occur in a valid relation
/// name, so computed keys never collide with alias keys.
pub const COMPUTED_KEY_PREFIX: char = '%';

/// Relation or permission name to its canonical cache key. Stored
/// relations map to their own name; aliased permissions map to the
/// terminal relation name; everything else maps to `%` plus 16 lowercase
/// hex digits. The keys cross process boundaries: both the token grammar
/// and the hash below are part of the durable contract.
pub type CanonicalKeyMap = BTreeMap<String, String>;

pub fn compute_canonical_cache_keys(
    type_system: &ValidatedTypeSystem,
    aliases: &AliasMap,
) -> CanonicalKeyMap {
    let mut keys = CanonicalKeyMap::new();
    for relation in type_system.relations() {
        let key = match &relation.rewrite {
            None => relation.name.clone(),
            Some(_) if aliases.contains_key(&relation.name) => {
                resolve_terminal(aliases, &relation.name).to_string()
            }
            Some(rewrite) => {
                let token = canonical_token(rewrite, type_system, aliases);
                format!("{COMPUTED_KEY_PREFIX}{:016x}", hash_token(&token))
            }
        };
        keys.insert(relation.name.clone(), key);
    }
    keys
}

/// Follows the alias map to its terminal name. Values are terminal by
/// construction; the loop guards against a future non-terminal entry.
fn resolve_terminal<'a>(aliases: &'a AliasMap, name: &'a str) -> &'a str {
    let mut current = name;
    while let Some(next) = aliases.get(current) {
        current = next;
    }
    current
}

/// FNV-1a over the raw token bytes. Changing this hash is a wire break
/// for every deployed cache.
fn hash_token(token: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(token.as_bytes());
    hasher.finish()
}

fn canonical_token(
    expression: &Expression,
    type_system: &ValidatedTypeSystem,
    aliases: &AliasMap,
) -> String {
    match expression {
        Expression::This => "_this".to_string(),
        Expression::Nil => "_nil".to_string(),
        Expression::ComputedRelation { name } => {
            resolve_reference(name, type_system, aliases).to_string()
        }
        Expression::TupleToRelation { tupleset, computed } => {
            // The tupleset is a local relation and is alias-resolved; the
            // computed relation lives on the reached objects' namespaces
            // and is kept verbatim.
            format!(
                "arrow({},{computed})",
                resolve_reference(tupleset, type_system, aliases)
            )
        }
        Expression::Rewrite(inner) => canonical_token(inner, type_system, aliases),
        Expression::Union(children) => {
            symmetric_token("union", children, true, type_system, aliases)
        }
        Expression::Intersection(children) => {
            symmetric_token("inter", children, false, type_system, aliases)
        }
        Expression::Exclusion(children) => {
            let mut tokens = Vec::with_capacity(children.len());
            exclusion_operands(children, &mut tokens, type_system, aliases);
            format!("excl({})", tokens.join(","))
        }
    }
}

/// Union and intersection: flatten nested multi-child same-operator
/// children, then sort and deduplicate the operand tokens. Sorting makes
/// the operators commutative, flattening makes them associative, and
/// deduplication makes them idempotent.
///
/// A one-child operator collapses to the child token only when the child
/// is a bare reference with an alias; any other wrapper is kept so that
/// e.g. a union with `Nil` never keys like its non-nil operand.
fn symmetric_token(
    operator: &str,
    children: &[Expression],
    is_union: bool,
    type_system: &ValidatedTypeSystem,
    aliases: &AliasMap,
) -> String {
    if children.len() == 1 {
        if let Expression::ComputedRelation { name } = children[0].unwrapped() {
            if let Some(target) = aliases.get(name.as_str()) {
                return resolve_terminal(aliases, target).to_string();
            }
        }
    }

    let mut tokens = Vec::with_capacity(children.len());
    symmetric_operands(children, is_union, &mut tokens, type_system, aliases);
    tokens.sort_unstable();
    tokens.dedup();
    format!("{operator}({})", tokens.join(","))
}

fn symmetric_operands(
    children: &[Expression],
    is_union: bool,
    out: &mut Vec<String>,
    type_system: &ValidatedTypeSystem,
    aliases: &AliasMap,
) {
    for child in children {
        match child.unwrapped() {
            Expression::Union(grandchildren) if is_union && grandchildren.len() > 1 => {
                symmetric_operands(grandchildren, is_union, out, type_system, aliases);
            }
            Expression::Intersection(grandchildren) if !is_union && grandchildren.len() > 1 => {
                symmetric_operands(grandchildren, is_union, out, type_system, aliases);
            }
            other => out.push(canonical_token(other, type_system, aliases)),
        }
    }
}

/// Exclusion operands in order, with no sorting and no deduplication. A
/// *leading* nested exclusion is spliced because subtraction chains are
/// left-associative: `(a - b) - c` and `a - b - c` are the same chain.
/// Nested exclusions in any other position stay intact.
fn exclusion_operands(
    children: &[Expression],
    out: &mut Vec<String>,
    type_system: &ValidatedTypeSystem,
    aliases: &AliasMap,
) {
    let Some((first, rest)) = children.split_first() else {
        return;
    };
    match first.unwrapped() {
        Expression::Exclusion(grandchildren) => {
            exclusion_operands(grandchildren, out, type_system, aliases);
        }
        other => out.push(canonical_token(other, type_system, aliases)),
    }
    for child in rest {
        out.push(canonical_token(child, type_system, aliases));
    }
}

fn resolve_reference<'a>(
    name: &'a str,
    type_system: &ValidatedTypeSystem,
    aliases: &'a AliasMap,
) -> &'a str {
    if let Some(target) = aliases.get(name) {
        return resolve_terminal(aliases, target);
    }
    if !type_system.has_relation(name) {
        warn!(
            namespace = type_system.name(),
            reference = name,
            "reference to unknown relation treated as opaque"
        );
    }
    name
}

#[cfg(test)]
mod tests {
    use super::{compute_canonical_cache_keys, COMPUTED_KEY_PREFIX};
    use crate::canonical::compute_permission_aliases;
    use crate::config::TypeSystemConfig;
    use crate::expression::Expression;
    use crate::typesystem::{
        NamespaceDefinition, RelationDefinition, StaticResolver, TypeSystem, ValidatedTypeSystem,
    };

    fn validated(relations: Vec<RelationDefinition>) -> ValidatedTypeSystem {
        let resolver = StaticResolver::default();
        TypeSystem::new(
            NamespaceDefinition::with_relations("document", relations),
            &resolver,
        )
        .validate(&TypeSystemConfig::default())
        .expect("validate")
    }

    fn keys_for(relations: Vec<RelationDefinition>) -> super::CanonicalKeyMap {
        let vts = validated(relations);
        let aliases = compute_permission_aliases(&vts);
        compute_canonical_cache_keys(&vts, &aliases)
    }

    #[test]
    fn computed_keys_have_the_marker_and_sixteen_hex_digits() {
        let keys = keys_for(vec![
            RelationDefinition::relation("owner"),
            RelationDefinition::relation("viewer"),
            RelationDefinition::permission(
                "view",
                Expression::union(vec![
                    Expression::computed("owner"),
                    Expression::computed("viewer"),
                ]),
            ),
        ]);
        assert_eq!(keys["owner"], "owner");
        assert_eq!(keys["viewer"], "viewer");

        let key = &keys["view"];
        assert!(key.starts_with(COMPUTED_KEY_PREFIX));
        assert_eq!(key.len(), 17);
        assert!(key[1..].bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn aliased_permissions_share_the_relation_name_key() {
        let keys = keys_for(vec![
            RelationDefinition::relation("owner"),
            RelationDefinition::permission(
                "edit",
                Expression::union(vec![Expression::computed("owner")]),
            ),
            RelationDefinition::permission(
                "other_edit",
                Expression::union(vec![Expression::computed("edit")]),
            ),
        ]);
        assert_eq!(keys["edit"], "owner");
        assert_eq!(keys["other_edit"], "owner");
    }

    #[test]
    fn alias_substitution_reaches_into_operands() {
        let keys = keys_for(vec![
            RelationDefinition::relation("owner"),
            RelationDefinition::relation("viewer"),
            RelationDefinition::permission(
                "edit",
                Expression::union(vec![Expression::computed("owner")]),
            ),
            RelationDefinition::permission(
                "view",
                Expression::union(vec![
                    Expression::computed("viewer"),
                    Expression::computed("edit"),
                ]),
            ),
            RelationDefinition::permission(
                "view_direct",
                Expression::union(vec![
                    Expression::computed("viewer"),
                    Expression::computed("owner"),
                ]),
            ),
        ]);
        assert_eq!(keys["view"], keys["view_direct"]);
    }

    #[test]
    fn duplicate_operands_do_not_change_the_key() {
        let keys = keys_for(vec![
            RelationDefinition::relation("owner"),
            RelationDefinition::relation("viewer"),
            RelationDefinition::permission(
                "first",
                Expression::union(vec![
                    Expression::computed("owner"),
                    Expression::computed("viewer"),
                ]),
            ),
            RelationDefinition::permission(
                "second",
                Expression::union(vec![
                    Expression::computed("viewer"),
                    Expression::computed("owner"),
                    Expression::computed("viewer"),
                ]),
            ),
        ]);
        assert_eq!(keys["first"], keys["second"]);
    }

    #[test]
    fn exclusion_preserves_operand_multiplicity() {
        let keys = keys_for(vec![
            RelationDefinition::relation("owner"),
            RelationDefinition::relation("viewer"),
            RelationDefinition::permission(
                "once",
                Expression::exclusion(vec![
                    Expression::computed("owner"),
                    Expression::computed("viewer"),
                ]),
            ),
            RelationDefinition::permission(
                "twice",
                Expression::exclusion(vec![
                    Expression::computed("owner"),
                    Expression::computed("viewer"),
                    Expression::computed("viewer"),
                ]),
            ),
        ]);
        assert_ne!(keys["once"], keys["twice"]);
    }

    #[test]
    fn single_child_wrappers_are_kept_for_non_aliased_children() {
        // union(arrow(...)) must not key like a bare arrow permission
        // keyed under a different operator, and a bare reference to a
        // hashed permission keeps the wrapper too.
        let keys = keys_for(vec![
            RelationDefinition::relation("parent"),
            RelationDefinition::permission(
                "from_parent",
                Expression::union(vec![Expression::arrow("parent", "viewer")]),
            ),
            RelationDefinition::permission(
                "from_parent_indirect",
                Expression::union(vec![Expression::computed("from_parent")]),
            ),
        ]);
        assert!(keys["from_parent"].starts_with(COMPUTED_KEY_PREFIX));
        assert!(keys["from_parent_indirect"].starts_with(COMPUTED_KEY_PREFIX));
        assert_ne!(keys["from_parent_indirect"], keys["from_parent"]);
    }

    #[test]
    fn unknown_references_hash_verbatim() {
        let keys = keys_for(vec![RelationDefinition::permission(
            "edit",
            Expression::union(vec![
                Expression::computed("missing"),
                Expression::This,
            ]),
        )]);
        assert!(keys["edit"].starts_with(COMPUTED_KEY_PREFIX));
    }

    #[test]
    fn key_map_is_deterministic() {
        let relations = || {
            vec![
                RelationDefinition::relation("owner"),
                RelationDefinition::relation("viewer"),
                RelationDefinition::permission(
                    "view",
                    Expression::union(vec![
                        Expression::computed("viewer"),
                        Expression::rewrite(Expression::intersection(vec![
                            Expression::computed("owner"),
                            Expression::This,
                        ])),
                    ]),
                ),
            ]
        };
        assert_eq!(keys_for(relations()), keys_for(relations()));
    }
}
