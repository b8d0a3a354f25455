use adminhub_auth::{RoleState, Session, SessionState};
use adminhub_core::CallerId;

/// Session context for a request.
///
/// Always present behind the session middleware; signed-out requests carry
/// the signed-out state rather than no context at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    state: SessionState,
}

impl SessionContext {
    pub fn new(state: SessionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    pub fn caller_id(&self) -> Option<CallerId> {
        self.state.session().map(|s| s.caller_id)
    }
}

/// Role the gate admitted the request with (role-gated routes only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    state: RoleState,
}

impl RoleContext {
    pub fn new(state: RoleState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &RoleState {
        &self.state
    }
}

/// Error code attached to error responses so the audit trail can record it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}
