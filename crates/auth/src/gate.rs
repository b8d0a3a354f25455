//! Route gating: the access decision for a protected view or action.
//!
//! - No IO
//! - No panics
//! - Denial is a value, never an error

use serde::Serialize;

use crate::resolver::RoleState;
use crate::roles::Role;
use crate::session::SessionState;

/// What a protected view requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRequirement {
    /// Any authenticated caller.
    Session,
    /// An authenticated caller at least as privileged as the given role.
    Role(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    /// Sign-in entry point; the denied location is carried along.
    SignIn,
    /// Application root.
    AppRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub target: RedirectTarget,
    /// Where the caller was going, so sign-in can send them back.
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Still waiting on the session or the role; render a loading indicator.
    Pending,
    Allow,
    Deny(Denial),
}

impl AccessDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, AccessDecision::Pending)
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AccessDecision::Deny(denial) => Some(denial),
            _ => None,
        }
    }
}

/// Paths the two redirect targets resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPaths {
    pub sign_in: String,
    pub app_root: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            sign_in: "/auth".to_string(),
            app_root: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGate {
    requirement: GateRequirement,
    paths: RedirectPaths,
}

impl RouteGate {
    pub fn session_only() -> Self {
        Self::new(GateRequirement::Session)
    }

    pub fn requiring(role: Role) -> Self {
        Self::new(GateRequirement::Role(role))
    }

    pub fn new(requirement: GateRequirement) -> Self {
        Self {
            requirement,
            paths: RedirectPaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: RedirectPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn requirement(&self) -> GateRequirement {
        self.requirement
    }

    /// Whether evaluating this gate needs a resolved role.
    pub fn needs_role(&self) -> bool {
        matches!(self.requirement, GateRequirement::Role(_))
    }

    /// Decide access for `location` from the latest session and role state.
    ///
    /// Rules, in order:
    /// 1. session still loading → Pending
    /// 2. no session → Deny(sign-in, carrying `location`)
    /// 3. session-only gate → Allow
    /// 4. role still loading → Pending
    /// 5. caller level strictly above the required level → Deny(app root)
    /// 6. otherwise → Allow
    pub fn evaluate(&self, session: &SessionState, role: &RoleState, location: &str) -> AccessDecision {
        if session.is_loading {
            return AccessDecision::Pending;
        }

        if session.user.is_none() {
            return AccessDecision::Deny(Denial {
                target: RedirectTarget::SignIn,
                return_to: Some(location.to_string()),
            });
        }

        let GateRequirement::Role(required) = self.requirement else {
            return AccessDecision::Allow;
        };

        if role.is_loading {
            return AccessDecision::Pending;
        }

        if role.effective_level() > required.level() {
            return AccessDecision::Deny(Denial {
                target: RedirectTarget::AppRoot,
                return_to: None,
            });
        }

        AccessDecision::Allow
    }

    /// Concrete redirect location for a denial.
    pub fn redirect_location(&self, denial: &Denial) -> String {
        match (denial.target, denial.return_to.as_deref()) {
            (RedirectTarget::SignIn, Some(back)) => format!(
                "{}?redirect={}",
                self.paths.sign_in,
                urlencoding::encode(back)
            ),
            (RedirectTarget::SignIn, None) => self.paths.sign_in.clone(),
            (RedirectTarget::AppRoot, _) => self.paths.app_root.clone(),
        }
    }
}
