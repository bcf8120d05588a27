// # Attachment Client Trait
//
// CRUD interface for an instance's network attachments.
//
// ## Retry Ownership
//
// Implementations must not retry or back off on their own: surface the raw
// remote error and let the engine classify it. If a client retries
// internally, the engine's retry bound and candidate-address fallback both
// misbehave.

use crate::error::Result;
use crate::model::{AttachmentObserved, AttachmentSpec};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tokio_util::sync::CancellationToken;

/// CRUD client for an instance's network attachments
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait AttachmentClient: Send + Sync {
    /// Attach the instance to the network described by `spec`
    ///
    /// `address_override` replaces `spec.address` when the engine is trying
    /// a fallback candidate; `None` lets the platform allocate.
    ///
    /// Surface the raw remote error text on failure; the engine classifies
    /// transient fabric contention from it.
    async fn create(
        &self,
        instance_id: &str,
        spec: &AttachmentSpec,
        address_override: Option<Ipv4Addr>,
        cancel: &CancellationToken,
    ) -> Result<AttachmentObserved>;

    /// Detach the instance from a network
    ///
    /// Must return [`Error::NotFound`] when the attachment is already absent
    /// so the engine can treat the delete as idempotent.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    async fn delete(
        &self,
        instance_id: &str,
        network_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Replace an attachment's firewall-group memberships
    async fn update_groups(
        &self,
        instance_id: &str,
        network_id: &str,
        firewall_group_ids: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// List the instance's attachments as currently observed
    ///
    /// Ordering is platform-defined; callers needing their own order run the
    /// result through [`reorder_to_match`].
    ///
    /// [`reorder_to_match`]: crate::order::reorder_to_match
    async fn list(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AttachmentObserved>>;
}
