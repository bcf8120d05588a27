//! Data model for attachments, rules, plans and apply results
//!
//! Spec types (`AttachmentSpec`, `Rule`) describe the caller's desired
//! configuration and are derived per reconciliation call; observed types
//! (`AttachmentObserved`) are fetched from the remote API at call start and
//! end. Neither is persisted by this crate.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Desired state of one virtual network interface
///
/// Identity is `network_id`; an instance carries at most one attachment per
/// network. At most one spec per instance may set `primary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    /// Network the interface attaches to (identity key)
    pub network_id: String,

    /// Firewall groups the interface must be a member of
    #[serde(default)]
    pub firewall_group_ids: BTreeSet<String>,

    /// Public address to bind, if any. An address maps 1:1 to an attachment;
    /// moving it requires prior disassociation from the former attachment.
    #[serde(default)]
    pub public_address_id: Option<String>,

    /// Whether this is the instance's primary interface
    #[serde(default)]
    pub primary: bool,

    /// Explicit private address request. When set, the candidate-address
    /// fallback is skipped on transient create failures.
    #[serde(default)]
    pub address: Option<Ipv4Addr>,

    /// The network's CIDR, when known. Input to the candidate-address
    /// fallback; the platform remains authoritative over assignment.
    #[serde(default)]
    pub subnet: Option<Ipv4Net>,
}

impl AttachmentSpec {
    /// Create a spec for the given network with empty memberships
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            firewall_group_ids: BTreeSet::new(),
            public_address_id: None,
            primary: false,
            address: None,
            subnet: None,
        }
    }

    /// Set the firewall group memberships
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.firewall_group_ids = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Set the public address binding
    pub fn with_public_address(mut self, address_id: impl Into<String>) -> Self {
        self.public_address_id = Some(address_id.into());
        self
    }

    /// Mark this attachment as the primary interface
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// Request an explicit private address
    pub fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = Some(address);
        self
    }

    /// Record the network's CIDR for candidate-address fallback
    pub fn with_subnet(mut self, subnet: Ipv4Net) -> Self {
        self.subnet = Some(subnet);
        self
    }
}

/// Most-recently-fetched remote state of one attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentObserved {
    /// Network the interface is attached to (identity key)
    pub network_id: String,

    /// Private address the platform assigned
    pub private_address: Option<Ipv4Addr>,

    /// Public address currently bound, if any
    pub public_address_id: Option<String>,

    /// Firewall groups as returned by the platform (unordered)
    pub firewall_group_ids: BTreeSet<String>,

    /// Primary flag as reported. Best-effort; the platform does not report
    /// this authoritatively on all list paths.
    pub primary: bool,
}

/// Traffic direction of a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

/// Protocol a firewall rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

/// Inclusive port range of a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Range covering a single port
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }
}

/// One firewall rule, used for both desired and observed rule sets
///
/// Identity is the whole tuple; rules have no update operation, so any
/// field difference reconciles as a delete plus a create.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rule {
    pub direction: Direction,
    pub protocol: Protocol,
    pub port_range: PortRange,
    /// Source (ingress) or destination (egress) network, as the platform
    /// reports it
    pub cidr: String,
}

impl Rule {
    pub fn new(
        direction: Direction,
        protocol: Protocol,
        port_range: PortRange,
        cidr: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            protocol,
            port_range,
            cidr: cidr.into(),
        }
    }
}

/// A public address as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAddress {
    /// Platform identifier of the address
    pub id: String,
    /// The address itself, once allocated
    pub address: Option<Ipv4Addr>,
    /// Network the address is currently bound to, if any
    pub attached_network_id: Option<String>,
}

/// One step of a reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Attach the instance to a network
    CreateAttachment { spec: AttachmentSpec },

    /// Detach the instance from a network
    DeleteAttachment { network_id: String },

    /// Replace an attachment's firewall-group memberships
    UpdateAttachmentGroups {
        network_id: String,
        firewall_group_ids: BTreeSet<String>,
    },

    /// Bind a public address to an attachment
    AssociateAddress {
        network_id: String,
        address_id: String,
    },

    /// Unbind a public address from an attachment
    DisassociateAddress {
        network_id: String,
        address_id: String,
    },

    /// Create a firewall rule
    CreateRule { rule: Rule },

    /// Delete a firewall rule
    DeleteRule { rule: Rule },
}

impl Operation {
    /// Short operation name for logs and error context
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateAttachment { .. } => "create_attachment",
            Operation::DeleteAttachment { .. } => "delete_attachment",
            Operation::UpdateAttachmentGroups { .. } => "update_attachment_groups",
            Operation::AssociateAddress { .. } => "associate_address",
            Operation::DisassociateAddress { .. } => "disassociate_address",
            Operation::CreateRule { .. } => "create_rule",
            Operation::DeleteRule { .. } => "delete_rule",
        }
    }

    /// The entity key this operation acts on, for error context
    pub fn key(&self) -> String {
        match self {
            Operation::CreateAttachment { spec } => spec.network_id.clone(),
            Operation::DeleteAttachment { network_id }
            | Operation::UpdateAttachmentGroups { network_id, .. } => network_id.clone(),
            Operation::AssociateAddress { address_id, .. }
            | Operation::DisassociateAddress { address_id, .. } => address_id.clone(),
            Operation::CreateRule { rule } | Operation::DeleteRule { rule } => format!(
                "{:?}/{:?}/{}-{}/{}",
                rule.direction, rule.protocol, rule.port_range.start, rule.port_range.end, rule.cidr
            ),
        }
    }
}

/// An ordered list of operations, built by the sequencer and consumed by the
/// apply executor within one reconciliation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Operations in execution order
    pub operations: Vec<Operation>,
}

impl ReconciliationPlan {
    /// An empty plan (desired already matches observed)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }
}

/// How a single plan operation concluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// The remote call succeeded
    Succeeded,

    /// Delete of a resource that was already absent remotely; treated as
    /// success (idempotent delete)
    AlreadyAbsent,

    /// A best-effort step failed and execution continued (full-replace rule
    /// deletions only)
    FailedBestEffort {
        /// Raw remote error text
        error: String,
    },
}

/// Record of one executed plan operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The operation that was executed
    pub operation: Operation,

    /// Number of remote attempts made, including candidate-address retries
    pub attempts: u32,

    /// How the operation concluded
    pub outcome: OutcomeKind,
}

/// Result of applying a plan that ran to completion
///
/// Fatal failures abort `apply` with an error instead; outcomes up to the
/// abort are observable on the engine's event channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedResult {
    /// Per-operation outcomes, in execution order
    pub outcomes: Vec<OperationOutcome>,
}

impl AppliedResult {
    /// Number of operations that succeeded (including idempotent deletes)
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.outcome,
                    OutcomeKind::Succeeded | OutcomeKind::AlreadyAbsent
                )
            })
            .count()
    }

    /// Number of best-effort failures that were skipped over
    pub fn best_effort_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, OutcomeKind::FailedBestEffort { .. }))
            .count()
    }
}

/// Remote resource status as reported by a [`StatusSource`]
///
/// `NotFound` is a value, not an error: a deleted resource cannot report
/// status, and the Status Waiter treats it as convergence.
///
/// [`StatusSource`]: crate::traits::StatusSource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// The resource does not exist remotely
    NotFound,
    /// The platform is still converging the resource
    Pending,
    /// The resource is live
    Active,
    /// The platform reports the resource in an error state
    Error(String),
}
