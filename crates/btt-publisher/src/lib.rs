//! Write side of btt-setting.
//!
//! A [`Publisher`] rolls one version forward in two stages. Stage 1 writes
//! values and the new rule-set under content-addressed keys; it is idempotent
//! and safe to interleave with other publishers. Stage 2 moves the version
//! pointer with a compare-and-swap that also appends the history record and
//! emits the update event, all in one atomic step.
//!
//! A publisher never retries. On [`PublishError::VersionMismatch`] the caller
//! re-reads and publishes again.

pub mod config;
pub mod error;
pub mod publisher;
pub mod request;

pub use config::PublisherConfig;
pub use error::{PublishError, PublishResult};
pub use publisher::{PublishReceipt, Publisher};
pub use request::{DeleteOp, InputValue, PublishRequest, RuleInput};
