//! Audit store adapters.
//!
//! Both write the same `api_logs` row shape; pick one with `AUDIT_STORE`.

mod postgres;
mod rest;

pub use postgres::PostgresAuditStore;
pub use rest::RestAuditStore;
