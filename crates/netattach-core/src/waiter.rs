//! Status Waiter
//!
//! Fixed-interval polling of a resource's status until a predicate holds or
//! a deadline elapses. The platform offers no push primitive, so polling is
//! modeled as one cancellable blocking call: the only component of the
//! engine that suspends longer than a network round trip.

use crate::error::{Error, Result};
use crate::model::ResourceStatus;
use crate::traits::StatusSource;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll `resource_id` until `predicate(status)` holds
///
/// - A `NotFound` poll counts as success regardless of the predicate: a
///   deleted resource cannot report status.
/// - When `timeout` elapses, returns [`Error::Timeout`]. The final poll
///   fires exactly at the deadline boundary, never after it.
/// - Cancellation before the deadline returns [`Error::Cancelled`]
///   immediately, distinct from timeout.
pub async fn wait_until<P>(
    source: &dyn StatusSource,
    resource_id: &str,
    mut predicate: P,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()>
where
    P: FnMut(&ResourceStatus) -> bool,
{
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!(
                "status wait for {resource_id} aborted"
            )));
        }

        let status = source.status(resource_id, cancel).await?;
        trace!(resource_id, ?status, "status poll");

        if matches!(status, ResourceStatus::NotFound) {
            debug!(resource_id, "resource gone, counting as converged");
            return Ok(());
        }
        if predicate(&status) {
            debug!(resource_id, ?status, "status converged");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::timeout(resource_id, timeout));
        }

        let sleep_for = poll_interval.min(deadline - now);
        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            _ = cancel.cancelled() => {
                return Err(Error::cancelled(format!(
                    "status wait for {resource_id} aborted"
                )));
            }
        }
    }
}
