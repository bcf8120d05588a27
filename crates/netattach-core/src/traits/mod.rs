//! Client traits consumed by the reconciliation engine
//!
//! Real implementations bind a cloud platform's SDK; tests inject fakes.
//! Every call takes the reconciliation call's cancellation token.

pub mod address_client;
pub mod attachment_client;
pub mod rule_client;
pub mod status_source;

pub use address_client::AddressClient;
pub use attachment_client::AttachmentClient;
pub use rule_client::RuleClient;
pub use status_source::StatusSource;
