//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Planning: diffing desired against observed collections and sequencing
//!   the result into a safe, minimal operation plan
//! - Applying: executing plan steps one at a time against injected clients,
//!   with transient-error retry and candidate-address fallback
//! - Waiting: polling resource status to convergence or deadline
//!
//! ## Architecture
//!
//! ```text
//! desired + observed
//!        │
//!        ▼
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ Differencer │────▶│  Sequencer   │────▶│ Apply Executor │
//! └─────────────┘     └──────────────┘     └────────────────┘
//!                                             │          │
//!                                   retry / classify   events
//!                                             │          │
//!                                             ▼          ▼
//!                                      injected clients  mpsc
//! ```
//!
//! ## Re-entrancy
//!
//! Partial plan application is never rolled back. A fatal failure aborts the
//! remaining steps; the caller re-fetches observed state and reconciles
//! again, which yields a corrective plan. This trades transactionality for
//! availability, since the platform offers no multi-resource transaction
//! primitive.

use crate::config::{EngineConfig, RuleStrategy};
use crate::error::{Error, Result};
use crate::model::{
    AppliedResult, AttachmentObserved, AttachmentSpec, Operation, OperationOutcome, OutcomeKind,
    ReconciliationPlan, ResourceStatus, Rule,
};
use crate::traits::{AddressClient, AttachmentClient, RuleClient, StatusSource};
use crate::{plan, retry, waiter};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the ReconcileEngine
///
/// Every operation's outcome is individually observable here, in addition
/// to tracing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A reconciliation plan was computed
    PlanComputed {
        /// Number of operations in the plan
        operations: usize,
    },

    /// A plan operation is about to execute
    OperationStarted { operation: Operation },

    /// A create attempt failed transiently and will be retried
    OperationRetried {
        operation: Operation,
        attempt: u32,
        error: String,
    },

    /// The candidate resolver is trying a fallback address
    CandidateAttempted {
        network_id: String,
        address: Ipv4Addr,
    },

    /// A plan operation succeeded
    OperationSucceeded { operation: Operation, attempts: u32 },

    /// A plan operation failed
    OperationFailed { operation: Operation, error: String },

    /// The whole plan ran to completion
    ApplyCompleted {
        operations: usize,
        best_effort_failures: usize,
    },
}

/// Core reconciliation engine
///
/// All remote calls go through client trait objects injected at
/// construction; the engine holds no local cache and no lock. Concurrent
/// reconciliation calls for different instances are independent, and the
/// remote API's own concurrency control is the sole arbiter of cross-call
/// races.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Plan with [`reconcile`](Self::reconcile) /
///    [`reconcile_rules`](Self::reconcile_rules)
/// 3. Execute with [`apply`](Self::apply), optionally block on
///    [`wait_for_status`](Self::wait_for_status)
/// 4. Re-fetch observed state and repeat until converged
pub struct ReconcileEngine {
    /// Attachment CRUD client
    attachments: Box<dyn AttachmentClient>,

    /// Public-address CRUD client
    addresses: Box<dyn AddressClient>,

    /// Firewall-rule CRUD client
    rules: Box<dyn RuleClient>,

    /// Resource-status getter for the waiter
    status: Box<dyn StatusSource>,

    /// Engine settings
    config: EngineConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new reconciliation engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        attachments: Box<dyn AttachmentClient>,
        addresses: Box<dyn AddressClient>,
        rules: Box<dyn RuleClient>,
        status: Box<dyn StatusSource>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            attachments,
            addresses,
            rules,
            status,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Compute the attachment reconciliation plan
    ///
    /// Pure planning: validates the desired set, diffs it against observed
    /// and sequences the result. No remote calls. Reconciling a well-formed
    /// collection against itself yields an empty plan.
    pub fn reconcile(
        &self,
        desired: &[AttachmentSpec],
        observed: &[AttachmentObserved],
    ) -> Result<ReconciliationPlan> {
        let plan = plan::plan_attachments(desired, observed)?;
        debug!(
            operations = plan.len(),
            desired = desired.len(),
            observed = observed.len(),
            "attachment plan computed"
        );
        self.emit_event(EngineEvent::PlanComputed {
            operations: plan.len(),
        });
        Ok(plan)
    }

    /// Compute the firewall-rule reconciliation plan
    ///
    /// Uses the configured [`RuleStrategy`].
    pub fn reconcile_rules(&self, desired: &[Rule], observed: &[Rule]) -> Result<ReconciliationPlan> {
        let plan = plan::plan_rules(desired, observed, self.config.rule_strategy)?;
        debug!(
            operations = plan.len(),
            strategy = ?self.config.rule_strategy,
            "rule plan computed"
        );
        self.emit_event(EngineEvent::PlanComputed {
            operations: plan.len(),
        });
        Ok(plan)
    }

    /// Execute a plan operation-by-operation, in sequencer order
    ///
    /// `target_id` is the instance for attachment plans and the rule-set
    /// (firewall group) for rule plans.
    ///
    /// Fatal errors abort the remaining steps and are returned; nothing is
    /// rolled back. In full-replace mode, rule deletion failures are logged
    /// and skipped instead (best-effort cleanup). Cancellation is checked
    /// before every step and during every backoff sleep; an in-flight
    /// operation finishes, but no further step starts after cancellation.
    pub async fn apply(
        &self,
        target_id: &str,
        plan: &ReconciliationPlan,
        cancel: &CancellationToken,
    ) -> Result<AppliedResult> {
        let mut outcomes = Vec::with_capacity(plan.len());

        for operation in plan.iter() {
            if cancel.is_cancelled() {
                return Err(Error::cancelled("apply aborted before next operation"));
            }

            self.emit_event(EngineEvent::OperationStarted {
                operation: operation.clone(),
            });

            match self.apply_operation(target_id, operation, cancel).await {
                Ok(outcome) => {
                    debug!(
                        kind = operation.kind(),
                        key = %operation.key(),
                        attempts = outcome.attempts,
                        "operation applied"
                    );
                    self.emit_event(EngineEvent::OperationSucceeded {
                        operation: operation.clone(),
                        attempts: outcome.attempts,
                    });
                    outcomes.push(outcome);
                }
                Err(err) => {
                    self.emit_event(EngineEvent::OperationFailed {
                        operation: operation.clone(),
                        error: err.to_string(),
                    });

                    let best_effort = matches!(operation, Operation::DeleteRule { .. })
                        && self.config.rule_strategy == RuleStrategy::FullReplace
                        && !err.is_cancelled();
                    if best_effort {
                        warn!(
                            key = %operation.key(),
                            error = %err,
                            "full-replace rule deletion failed, continuing"
                        );
                        outcomes.push(OperationOutcome {
                            operation: operation.clone(),
                            attempts: 1,
                            outcome: OutcomeKind::FailedBestEffort {
                                error: err.to_string(),
                            },
                        });
                        continue;
                    }

                    error!(
                        kind = operation.kind(),
                        key = %operation.key(),
                        error = %err,
                        "apply aborted"
                    );
                    return Err(err);
                }
            }
        }

        let result = AppliedResult { outcomes };
        info!(
            operations = result.outcomes.len(),
            best_effort_failures = result.best_effort_failures(),
            "plan applied"
        );
        self.emit_event(EngineEvent::ApplyCompleted {
            operations: result.outcomes.len(),
            best_effort_failures: result.best_effort_failures(),
        });
        Ok(result)
    }

    /// Poll a resource's status until `predicate` holds
    ///
    /// Uses the configured poll interval. See [`waiter::wait_until`] for the
    /// NotFound, timeout and cancellation semantics.
    pub async fn wait_for_status<P>(
        &self,
        resource_id: &str,
        predicate: P,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        P: FnMut(&ResourceStatus) -> bool,
    {
        waiter::wait_until(
            self.status.as_ref(),
            resource_id,
            predicate,
            self.config.poll_interval(),
            timeout,
            cancel,
        )
        .await
    }

    /// Execute a single plan operation
    async fn apply_operation(
        &self,
        target_id: &str,
        operation: &Operation,
        cancel: &CancellationToken,
    ) -> Result<OperationOutcome> {
        let outcome = match operation {
            Operation::CreateAttachment { spec } => {
                return self.create_with_retry(target_id, spec, cancel).await;
            }

            Operation::DeleteAttachment { network_id } => {
                match self.attachments.delete(target_id, network_id, cancel).await {
                    Ok(()) => OutcomeKind::Succeeded,
                    Err(Error::NotFound(_)) => {
                        debug!(%network_id, "attachment already absent, delete is a no-op");
                        OutcomeKind::AlreadyAbsent
                    }
                    Err(err) => return Err(contextualize(operation, err)),
                }
            }

            Operation::UpdateAttachmentGroups {
                network_id,
                firewall_group_ids,
            } => {
                self.attachments
                    .update_groups(target_id, network_id, firewall_group_ids, cancel)
                    .await
                    .map_err(|err| contextualize(operation, err))?;
                OutcomeKind::Succeeded
            }

            Operation::AssociateAddress {
                network_id,
                address_id,
            } => {
                self.addresses
                    .associate(target_id, network_id, address_id, cancel)
                    .await
                    .map_err(|err| contextualize(operation, err))?;
                OutcomeKind::Succeeded
            }

            Operation::DisassociateAddress { address_id, .. } => {
                self.addresses
                    .disassociate(target_id, address_id, cancel)
                    .await
                    .map_err(|err| contextualize(operation, err))?;
                OutcomeKind::Succeeded
            }

            Operation::CreateRule { rule } => {
                self.rules
                    .create(target_id, rule, cancel)
                    .await
                    .map_err(|err| contextualize(operation, err))?;
                OutcomeKind::Succeeded
            }

            Operation::DeleteRule { rule } => {
                match self.rules.delete(target_id, rule, cancel).await {
                    Ok(()) => OutcomeKind::Succeeded,
                    Err(Error::NotFound(_)) => {
                        debug!(key = %operation.key(), "rule already absent, delete is a no-op");
                        OutcomeKind::AlreadyAbsent
                    }
                    Err(err) => return Err(contextualize(operation, err)),
                }
            }
        };

        Ok(OperationOutcome {
            operation: operation.clone(),
            attempts: 1,
            outcome,
        })
    }

    /// Create an attachment with transient retry and candidate fallback
    ///
    /// Up to `max_attempts` tries with the original request and fixed
    /// backoff, while failures classify as transient. If all are exhausted
    /// and the spec carried no explicit address but a subnet is known, each
    /// valid candidate address is tried once; the first accepted candidate
    /// wins, otherwise the last error surfaces.
    async fn create_with_retry(
        &self,
        instance_id: &str,
        spec: &AttachmentSpec,
        cancel: &CancellationToken,
    ) -> Result<OperationOutcome> {
        let operation = Operation::CreateAttachment { spec: spec.clone() };
        let mut attempts = 0u32;
        let mut last_error: Option<Error> = None;

        for attempt in 1..=self.config.max_attempts {
            attempts += 1;
            match self
                .attachments
                .create(instance_id, spec, spec.address, cancel)
                .await
            {
                Ok(_) => {
                    return Ok(OperationOutcome {
                        operation,
                        attempts,
                        outcome: OutcomeKind::Succeeded,
                    });
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) if retry::is_transient(&err) => {
                    warn!(
                        network_id = %spec.network_id,
                        attempt,
                        error = %err,
                        "transient attachment create failure"
                    );
                    self.emit_event(EngineEvent::OperationRetried {
                        operation: operation.clone(),
                        attempt,
                        error: err.to_string(),
                    });
                    last_error = Some(err);
                    if attempt < self.config.max_attempts {
                        self.backoff(cancel).await?;
                    }
                }
                Err(err) => return Err(contextualize(&operation, err)),
            }
        }

        // Opportunistic fallback: the caller left address allocation to the
        // platform, so offer it explicit candidates instead.
        if spec.address.is_none() {
            if let Some(subnet) = spec.subnet {
                for candidate in retry::candidate_addresses(subnet) {
                    if cancel.is_cancelled() {
                        return Err(Error::cancelled("apply aborted before candidate attempt"));
                    }
                    debug!(
                        network_id = %spec.network_id,
                        %candidate,
                        "trying candidate address"
                    );
                    self.emit_event(EngineEvent::CandidateAttempted {
                        network_id: spec.network_id.clone(),
                        address: candidate,
                    });
                    attempts += 1;
                    match self
                        .attachments
                        .create(instance_id, spec, Some(candidate), cancel)
                        .await
                    {
                        Ok(_) => {
                            return Ok(OperationOutcome {
                                operation,
                                attempts,
                                outcome: OutcomeKind::Succeeded,
                            });
                        }
                        Err(err) if err.is_cancelled() => return Err(err),
                        Err(err) => {
                            warn!(
                                network_id = %spec.network_id,
                                %candidate,
                                error = %err,
                                "candidate address rejected"
                            );
                            last_error = Some(err);
                        }
                    }
                }
            }
        }

        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "attachment create failed".to_string());
        Err(Error::operation_failed(
            "create_attachment",
            &spec.network_id,
            message,
        ))
    }

    /// Fixed-delay retry backoff, racing the cancellation token
    async fn backoff(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_delay()) => Ok(()),
            _ = cancel.cancelled() => Err(Error::cancelled("retry backoff aborted")),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging a warning if the channel is full. Dropping is
        // preferable to blocking plan execution on a slow consumer.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}

/// Attach operation and entity-key context to a client error
///
/// Conflicts keep their variant (and remote identifier); cancellation and
/// timeouts pass through untouched; everything else becomes a fatal
/// operation failure carrying the raw remote text.
fn contextualize(operation: &Operation, error: Error) -> Error {
    match error {
        Error::Cancelled(_) | Error::Timeout { .. } => error,
        Error::Conflict {
            remote_id, message, ..
        } => Error::Conflict {
            operation: operation.kind().to_string(),
            key: operation.key(),
            remote_id,
            message,
        },
        other => Error::operation_failed(operation.kind(), operation.key(), other.to_string()),
    }
}
