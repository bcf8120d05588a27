// # Address Client Trait
//
// CRUD interface for public-address bindings. A public address maps 1:1 to
// an attachment; the platform rejects double association, and that
// rejection (not any local lock) is the arbiter of cross-call races.

use crate::error::Result;
use crate::model::PublicAddress;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// CRUD client for public addresses
#[async_trait]
pub trait AddressClient: Send + Sync {
    /// Bind a public address to the instance's attachment on `network_id`
    ///
    /// Must fail (conflict) if the address is already bound elsewhere; the
    /// engine never associates before disassociating.
    async fn associate(
        &self,
        instance_id: &str,
        network_id: &str,
        address_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Unbind a public address from the instance
    ///
    /// Must fail if the address is not currently bound.
    async fn disassociate(
        &self,
        instance_id: &str,
        address_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Fetch a public address's current state
    async fn get(&self, address_id: &str, cancel: &CancellationToken) -> Result<PublicAddress>;
}
