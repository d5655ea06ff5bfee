//! File-backed adapters
//!
//! Suitable for a single engine process owning its data directory.

pub(crate) mod jsonl;
pub mod audit_files;
pub mod policy_ledger;
pub mod review_log;

pub use audit_files::JsonFileAuditSink;
pub use policy_ledger::{JsonlPolicyLedger, LedgerEntry};
pub use review_log::JsonlReviewStore;
