use std::collections::HashMap;

use tracing::debug;

use crate::typesystem::ValidatedTypeSystem;

/// Permission name to the stored-relation name it is an alias of.
/// Built once per validated namespace; immutable thereafter.
pub type AliasMap = HashMap<String, String>;

/// Computes which permissions are structurally indistinguishable from a
/// stored relation, so they can share its cache key verbatim.
///
/// A permission is alias-shaped when its expression is exactly a single
/// bare reference (optionally inside a one-child union). The map is the
/// fixed point of adopting already-resolved targets: pass order is
/// irrelevant because the relation is monotone, and the loop terminates
/// because each pass either grows the map or exits.
pub fn compute_permission_aliases(type_system: &ValidatedTypeSystem) -> AliasMap {
    let mut aliases = AliasMap::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut changed = false;
        for relation in type_system.relations() {
            let Some(rewrite) = &relation.rewrite else {
                continue;
            };
            if aliases.contains_key(&relation.name) {
                continue;
            }
            let Some(target) = rewrite.as_single_reference() else {
                continue;
            };
            if type_system.is_stored_relation(target) {
                aliases.insert(relation.name.clone(), target.to_string());
                changed = true;
            } else if let Some(terminal) = aliases.get(target) {
                // Adopt the target's mapping, keeping every value terminal.
                let terminal = terminal.clone();
                aliases.insert(relation.name.clone(), terminal);
                changed = true;
            }
            // References to hashed permissions or unknown names are opaque:
            // no alias is emitted for them.
        }
        if !changed {
            break;
        }
    }
    debug!(
        namespace = type_system.name(),
        aliases = aliases.len(),
        passes,
        "computed permission aliases"
    );
    aliases
}
