// # Rule Client Trait
//
// CRUD interface for firewall rules within one rule set (firewall group).
// Rules are addressed by their full identity tuple; there is no update.

use crate::error::Result;
use crate::model::Rule;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// CRUD client for firewall rules
#[async_trait]
pub trait RuleClient: Send + Sync {
    /// Create a rule in the given rule set
    async fn create(&self, scope_id: &str, rule: &Rule, cancel: &CancellationToken) -> Result<()>;

    /// Delete a rule from the given rule set
    async fn delete(&self, scope_id: &str, rule: &Rule, cancel: &CancellationToken) -> Result<()>;

    /// List the rule set as currently observed (unordered)
    async fn list(&self, scope_id: &str, cancel: &CancellationToken) -> Result<Vec<Rule>>;
}
