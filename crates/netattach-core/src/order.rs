//! Order Reconciler
//!
//! The remote API does not preserve caller-specified ordering when listing
//! collections. This module remaps a freshly fetched collection back into
//! the caller's preferred order, so that repeated reconciliation against
//! unchanged desired state shows zero drift.

use std::collections::BTreeMap;

/// Reorder `fresh` to match `order`
///
/// Entities whose key appears in `order` are emitted in that sequence;
/// entities absent from `order` are appended afterward in ascending-key
/// order. If cardinalities differ (a created or deleted entity not yet
/// reflected remotely), the whole collection is returned in ascending-key
/// order untouched rather than fabricating a misleading 1:1 remap.
pub fn reorder_to_match<E, F>(order: &[String], fresh: Vec<E>, key_of: F) -> Vec<E>
where
    F: Fn(&E) -> &str,
{
    if order.len() != fresh.len() {
        let mut fallback = fresh;
        fallback.sort_by(|a, b| key_of(a).cmp(key_of(b)));
        return fallback;
    }

    let mut by_key: BTreeMap<String, E> = fresh
        .into_iter()
        .map(|entity| (key_of(&entity).to_string(), entity))
        .collect();

    let mut ordered = Vec::with_capacity(order.len());
    for key in order {
        if let Some(entity) = by_key.remove(key) {
            ordered.push(entity);
        }
    }

    // Leftovers were not named by the caller; BTreeMap iteration gives the
    // ascending-key fallback order.
    ordered.extend(by_key.into_values());
    ordered
}
