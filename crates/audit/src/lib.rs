//! `adminhub-audit`: fire-and-forget audit trail for access and API events.
//!
//! Call sites build an [`AuditLogEntry`] once the audited action has completed
//! and hand it to [`AuditRecorder::record`]. The write happens on a detached
//! task; its outcome never reaches the caller.

pub mod entry;
pub mod error;
pub mod recorder;
pub mod redaction;
pub mod store;

pub use entry::{AuditLogBuilder, AuditLogEntry, AuditRecord, AUDIT_TABLE};
pub use error::AuditStoreError;
pub use recorder::AuditRecorder;
pub use store::{AuditStore, InMemoryAuditStore};
