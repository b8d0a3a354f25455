use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use adminhub_core::CallerId;

/// An authenticated caller, as vouched for by the identity provider.
///
/// Read-only here: this crate never issues or refreshes the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub caller_id: CallerId,
    access_token: String,
}

impl Session {
    pub fn new(caller_id: CallerId, access_token: impl Into<String>) -> Self {
        Self {
            caller_id,
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("caller_id", &self.caller_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// What the identity provider currently knows: `{ user, isLoading }`.
///
/// `user: None` with `is_loading: false` is the signed-out state, which is
/// terminal and valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub user: Option<Session>,
    pub is_loading: bool,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            user: Some(session),
            is_loading: false,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.user.as_ref()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

/// Identity provider seam.
///
/// `Ok(None)` means the token does not identify a live session (expired,
/// revoked, garbage). Errors are reserved for "could not ask".
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn session_for(&self, access_token: &str) -> Result<Option<Session>, IdentityError>;
}

/// In-memory identity provider keyed by access token (tests / local development).
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: RwLock<HashMap<String, CallerId>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, access_token: impl Into<String>, caller_id: CallerId) {
        self.tokens
            .write()
            .unwrap()
            .insert(access_token.into(), caller_id);
    }

    pub fn revoke(&self, access_token: &str) {
        self.tokens.write().unwrap().remove(access_token);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn session_for(&self, access_token: &str) -> Result<Option<Session>, IdentityError> {
        let caller = self.tokens.read().unwrap().get(access_token).copied();
        Ok(caller.map(|caller_id| Session::new(caller_id, access_token)))
    }
}
