//! Entity Differencer
//!
//! Pure diff of two keyed collections into disjoint create / update / delete
//! key sets. No side effects; output order is deterministic (ascending key)
//! so that identical inputs always produce identical plans.

use std::collections::BTreeMap;

/// Disjoint key sets produced by [`diff_keyed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult<K> {
    /// Keys present in desired but not observed
    pub to_create: Vec<K>,
    /// Keys present in both where the equality predicate reported a change
    pub to_update: Vec<K>,
    /// Keys present in observed but not desired
    pub to_delete: Vec<K>,
}

impl<K> DiffResult<K> {
    /// True when desired and observed already converge
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff `desired` against `observed`
///
/// `needs_update` is consulted only for keys present on both sides; it
/// reports whether the observed entity differs from the desired one in a way
/// that requires an update operation. For entity families without an update
/// operation (firewall rules), pass a predicate that always returns false:
/// any field difference is then reflected in the key itself and yields a
/// create/delete pair.
pub fn diff_keyed<K, D, O, F>(
    desired: &BTreeMap<K, D>,
    observed: &BTreeMap<K, O>,
    mut needs_update: F,
) -> DiffResult<K>
where
    K: Ord + Clone,
    F: FnMut(&D, &O) -> bool,
{
    let mut to_create = Vec::new();
    let mut to_update = Vec::new();
    let mut to_delete = Vec::new();

    for (key, want) in desired {
        match observed.get(key) {
            None => to_create.push(key.clone()),
            Some(have) => {
                if needs_update(want, have) {
                    to_update.push(key.clone());
                }
            }
        }
    }

    for key in observed.keys() {
        if !desired.contains_key(key) {
            to_delete.push(key.clone());
        }
    }

    DiffResult {
        to_create,
        to_update,
        to_delete,
    }
}
