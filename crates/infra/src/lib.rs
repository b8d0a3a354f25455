//! Infrastructure layer: platform-backed adapters for the identity and audit seams.

pub mod audit_store;
pub mod identity;

pub use audit_store::{PostgresAuditStore, RestAuditStore};
pub use identity::HttpIdentityProvider;
