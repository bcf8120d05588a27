//! Operation Sequencer
//!
//! Converts diff results into a strictly ordered [`ReconciliationPlan`]
//! obeying two hard rules:
//!
//! - **Create-before-delete** for attachments: the instance never
//!   transiently drops to zero attachments.
//! - **Disassociate-before-associate** for public addresses: an address is
//!   never bound to two attachments, even momentarily. All disassociations
//!   precede all associations, which also covers an address moving between
//!   two attachments in one plan.
//!
//! Planning is pure: no client calls, no side effects. Validation runs
//! before any plan is built.

use crate::config::RuleStrategy;
use crate::diff::diff_keyed;
use crate::error::{Error, Result};
use crate::model::{
    AttachmentObserved, AttachmentSpec, Operation, ReconciliationPlan, Rule,
};
use std::collections::BTreeMap;

/// Index desired specs by network id, rejecting duplicates
fn index_specs(desired: &[AttachmentSpec]) -> Result<BTreeMap<&str, &AttachmentSpec>> {
    let mut index = BTreeMap::new();
    for spec in desired {
        if index.insert(spec.network_id.as_str(), spec).is_some() {
            return Err(Error::planning(format!(
                "duplicate network {} in desired attachments",
                spec.network_id
            )));
        }
    }
    Ok(index)
}

/// Index observed attachments by network id, rejecting duplicates
fn index_observed(
    observed: &[AttachmentObserved],
) -> Result<BTreeMap<&str, &AttachmentObserved>> {
    let mut index = BTreeMap::new();
    for attachment in observed {
        if index
            .insert(attachment.network_id.as_str(), attachment)
            .is_some()
        {
            return Err(Error::planning(format!(
                "duplicate network {} in observed attachments",
                attachment.network_id
            )));
        }
    }
    Ok(index)
}

/// Validate desired attachments against the observed set
///
/// - at most one spec may be primary
/// - the primary flag of an attachment that already exists remotely is
///   immutable; flipping it is a validation error, never planned
fn validate_attachments(
    desired: &BTreeMap<&str, &AttachmentSpec>,
    observed: &BTreeMap<&str, &AttachmentObserved>,
) -> Result<()> {
    let primaries = desired.values().filter(|spec| spec.primary).count();
    if primaries > 1 {
        return Err(Error::validation(format!(
            "{primaries} attachments marked primary, at most one allowed"
        )));
    }

    for (network_id, spec) in desired {
        if let Some(have) = observed.get(network_id) {
            if spec.primary != have.primary {
                return Err(Error::validation(format!(
                    "primary flag of attachment {network_id} is immutable; \
                     detach and re-attach to change it"
                )));
            }
        }
    }

    Ok(())
}

/// True when an existing attachment needs an update operation
///
/// The primary flag is excluded: it is validated as immutable, and the
/// observed value is best-effort anyway. Assigned private addresses are the
/// platform's business and never diffed.
fn attachment_changed(want: &AttachmentSpec, have: &AttachmentObserved) -> bool {
    want.firewall_group_ids != have.firewall_group_ids
        || want.public_address_id != have.public_address_id
}

/// Build the attachment reconciliation plan
///
/// Operation order: all creates, then group updates, then all
/// disassociations, then all associations, then all deletes.
pub fn plan_attachments(
    desired: &[AttachmentSpec],
    observed: &[AttachmentObserved],
) -> Result<ReconciliationPlan> {
    let desired_index = index_specs(desired)?;
    let observed_index = index_observed(observed)?;
    validate_attachments(&desired_index, &observed_index)?;

    let diff = diff_keyed(&desired_index, &observed_index, |want, have| {
        attachment_changed(want, have)
    });

    let mut operations = Vec::new();

    // Phase 1: creates. Strictly before every delete so the instance never
    // drops to zero attachments.
    for network_id in &diff.to_create {
        let spec = desired_index[network_id];
        operations.push(Operation::CreateAttachment { spec: spec.clone() });
    }

    // Phase 2a: group membership updates for surviving attachments.
    for network_id in &diff.to_update {
        let want = desired_index[network_id];
        let have = observed_index[network_id];
        if want.firewall_group_ids != have.firewall_group_ids {
            operations.push(Operation::UpdateAttachmentGroups {
                network_id: network_id.to_string(),
                firewall_group_ids: want.firewall_group_ids.clone(),
            });
        }
    }

    // Phase 2b: every disassociation before every association, covering
    // both per-key rebinding and an address migrating between keys. Doomed
    // attachments release their address here too: their delete runs last,
    // so without this an address migrating off a to-delete attachment would
    // still be bound when the associate fires.
    for network_id in &diff.to_update {
        let want = desired_index[network_id];
        let have = observed_index[network_id];
        if want.public_address_id != have.public_address_id {
            if let Some(current) = &have.public_address_id {
                operations.push(Operation::DisassociateAddress {
                    network_id: network_id.to_string(),
                    address_id: current.clone(),
                });
            }
        }
    }
    for network_id in &diff.to_delete {
        let have = observed_index[network_id];
        if let Some(current) = &have.public_address_id {
            operations.push(Operation::DisassociateAddress {
                network_id: network_id.to_string(),
                address_id: current.clone(),
            });
        }
    }
    for network_id in &diff.to_create {
        let spec = desired_index[network_id];
        if let Some(address_id) = &spec.public_address_id {
            operations.push(Operation::AssociateAddress {
                network_id: network_id.to_string(),
                address_id: address_id.clone(),
            });
        }
    }
    for network_id in &diff.to_update {
        let want = desired_index[network_id];
        let have = observed_index[network_id];
        if want.public_address_id != have.public_address_id {
            if let Some(target) = &want.public_address_id {
                operations.push(Operation::AssociateAddress {
                    network_id: network_id.to_string(),
                    address_id: target.clone(),
                });
            }
        }
    }

    // Phase 3: deletes, last.
    for network_id in &diff.to_delete {
        operations.push(Operation::DeleteAttachment {
            network_id: network_id.to_string(),
        });
    }

    Ok(ReconciliationPlan { operations })
}

/// Index desired rules by their identity tuple, rejecting duplicates
fn index_desired_rules(rules: &[Rule]) -> Result<BTreeMap<&Rule, ()>> {
    let mut index = BTreeMap::new();
    for rule in rules {
        if index.insert(rule, ()).is_some() {
            return Err(Error::planning(format!(
                "duplicate rule in desired set: {rule:?}"
            )));
        }
    }
    Ok(index)
}

/// Index observed rules, collapsing duplicates
///
/// Some platforms report the same rule twice. Treating that as fatal would
/// leave the group permanently unreconcilable, so duplicates collapse into
/// one entry and the plan proceeds.
fn index_observed_rules(rules: &[Rule]) -> BTreeMap<&Rule, ()> {
    rules.iter().map(|rule| (rule, ())).collect()
}

/// Build the firewall-rule reconciliation plan
///
/// Surgical: delete the rules that disappeared, create the rules that
/// appeared, nothing else. Full-replace: delete every observed rule then
/// create every desired rule, for platforms that cannot reliably address
/// individual rules. Both orders deletes before creates.
pub fn plan_rules(
    desired: &[Rule],
    observed: &[Rule],
    strategy: RuleStrategy,
) -> Result<ReconciliationPlan> {
    let desired_index = index_desired_rules(desired)?;
    let observed_index = index_observed_rules(observed);

    let mut operations = Vec::new();

    match strategy {
        RuleStrategy::Surgical => {
            // Identity is the whole tuple, so the update set is always
            // empty; changed rules show up as a delete plus a create.
            let diff = diff_keyed(&desired_index, &observed_index, |_, _| false);

            for rule in diff.to_delete {
                operations.push(Operation::DeleteRule { rule: rule.clone() });
            }
            for rule in diff.to_create {
                operations.push(Operation::CreateRule { rule: rule.clone() });
            }
        }
        RuleStrategy::FullReplace => {
            if desired_index == observed_index {
                return Ok(ReconciliationPlan::empty());
            }
            for rule in observed_index.keys() {
                operations.push(Operation::DeleteRule {
                    rule: (*rule).clone(),
                });
            }
            // Creation keeps caller order; the platform list order is not
            // trusted anyway.
            for rule in desired {
                operations.push(Operation::CreateRule { rule: rule.clone() });
            }
        }
    }

    Ok(ReconciliationPlan { operations })
}
