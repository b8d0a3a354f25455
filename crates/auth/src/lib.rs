//! `adminhub-auth`: role hierarchy, role resolution and route gating.
//!
//! The identity provider and the remote procedure that reports roles are
//! external; this crate consumes them through [`IdentityProvider`] and
//! [`adminhub_rpc::RemoteInvoker`] and never authenticates anyone itself.

pub mod driver;
pub mod gate;
pub mod resolver;
pub mod roles;
pub mod session;

pub use driver::{GateDriver, GateHandle};
pub use gate::{AccessDecision, Denial, GateRequirement, RedirectPaths, RedirectTarget, RouteGate};
pub use resolver::{RoleCache, RoleFetch, RoleResolver, RoleState, DEFAULT_ROLE_TTL};
pub use roles::{hierarchy_level, ReportedRole, Role, UNKNOWN_ROLE_LEVEL};
pub use session::{IdentityError, IdentityProvider, Session, SessionState, StaticIdentityProvider};
