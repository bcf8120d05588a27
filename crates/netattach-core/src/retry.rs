//! Transient-Error Classifier & Candidate Resolver
//!
//! The remote platform reports fabric contention as plain error text, so
//! classification is substring matching against a known signature list. The
//! list is deliberately one extensible constant; control flow never inspects
//! error text anywhere else.

use crate::error::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Error-text signatures classified as transient
///
/// Matching is case-insensitive substring containment.
pub const TRANSIENT_SIGNATURES: &[&str] = &[
    "address not valid for subnet",
    "temporarily unavailable",
];

/// Host-address offsets from the CIDR base tried by the candidate resolver
///
/// Heuristic sampling of the subnet; preserved as-is rather than tuned.
pub const CANDIDATE_OFFSETS: &[u32] = &[10, 20, 30, 40, 50];

/// Classify an error as transient (retryable) or fatal
///
/// Only raw API errors are inspected; conflicts, cancellation and anything
/// already classified stay fatal.
pub fn is_transient(error: &Error) -> bool {
    match error {
        Error::TransientApi(_) => true,
        Error::Api(text) => is_transient_text(text),
        _ => false,
    }
}

/// Classify raw remote error text
pub fn is_transient_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRANSIENT_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

/// Compute fallback host addresses for a create that exhausted its retries
///
/// Applies [`CANDIDATE_OFFSETS`] to the network's base address and keeps
/// only candidates inside the subnet range. Opportunistic: the platform
/// remains authoritative over address assignment, and a dense subnet may
/// reject every candidate.
pub fn candidate_addresses(subnet: Ipv4Net) -> Vec<Ipv4Addr> {
    let base = u32::from(subnet.network());
    CANDIDATE_OFFSETS
        .iter()
        .filter_map(|offset| {
            let candidate = Ipv4Addr::from(base.checked_add(*offset)?);
            subnet.contains(&candidate).then_some(candidate)
        })
        .collect()
}
