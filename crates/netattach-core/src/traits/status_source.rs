// # Status Source Trait
//
// Resource-status getter polled by the Status Waiter.

use crate::error::Result;
use crate::model::ResourceStatus;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Resource-status getter
///
/// A missing resource is reported as [`ResourceStatus::NotFound`], not as an
/// error: the waiter treats it as convergence (a deleted resource cannot
/// report status).
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the resource's current status
    async fn status(
        &self,
        resource_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceStatus>;
}
