// # netattach-core
//
// Core library for the instance network-attachment reconciliation engine.
//
// ## Architecture Overview
//
// This library reconciles a declarative description of an instance's network
// attachments (virtual NICs with firewall-group memberships and optional
// public-address bindings) and firewall rule lists against an asynchronous,
// eventually-consistent cloud control-plane API:
//
// - **diff**: pure keyed differencing of desired vs observed collections
// - **plan**: ordering of diff results into a safe execution plan
// - **retry**: transient-error classification and candidate-address fallback
// - **ReconcileEngine**: sequential plan execution against injected clients
// - **waiter**: status polling to convergence or deadline
// - **order**: remapping fresh collections into caller-preferred order
//
// ## Design Principles
//
// 1. **Separation of Concerns**: planning is pure, execution is sequential
// 2. **Injected Clients**: all remote calls go through trait objects, so the
//    engine is testable against fakes and holds no hidden shared state
// 3. **Re-entrancy**: partial failures are never rolled back; re-running
//    reconciliation against fresh observed state yields a corrective plan
// 4. **Retry Ownership**: clients surface errors, the engine classifies and
//    retries; clients must not implement their own retry loops

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod order;
pub mod plan;
pub mod retry;
pub mod traits;
pub mod waiter;

// Re-export core types for convenience
pub use config::{EngineConfig, RuleStrategy};
pub use diff::{DiffResult, diff_keyed};
pub use engine::{EngineEvent, ReconcileEngine};
pub use error::{Error, Result};
pub use model::{
    AppliedResult, AttachmentObserved, AttachmentSpec, Operation, OperationOutcome, OutcomeKind,
    PublicAddress, ReconciliationPlan, ResourceStatus, Rule,
};
pub use order::reorder_to_match;
pub use traits::{AddressClient, AttachmentClient, RuleClient, StatusSource};
pub use waiter::wait_until;
