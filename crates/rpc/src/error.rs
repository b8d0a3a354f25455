use thiserror::Error;

/// Message used when a failure channel reports an error without a message.
pub const FALLBACK_MESSAGE: &str = "invocation failed";

/// Unified failure of a remote procedure invocation.
///
/// `Display` renders exactly the message that was reported, so UI layers can
/// show it verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The call did not complete (network, protocol, non-2xx status).
    #[error("{message}")]
    Transport { message: String },

    /// The call completed but the payload carried an embedded `error`.
    #[error("{message}")]
    Application { message: String },

    /// The payload was well-formed JSON but not the shape the caller asked for.
    #[error("unexpected response from '{procedure}': {reason}")]
    Decode { procedure: String, reason: String },
}

impl InvokeError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
