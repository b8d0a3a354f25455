//! `adminhub-core`: shared identifiers and the domain error model.
//!
//! No IO and no async here; every other crate in the workspace builds on these.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ApiKeyId, CallerId};
