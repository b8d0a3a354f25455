use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{InvokeError, FALLBACK_MESSAGE};

/// A single remote procedure call as handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub procedure: String,
    pub payload: JsonValue,
    /// Caller credential forwarded to the platform, if the call is made on
    /// behalf of an authenticated caller.
    pub credential: Option<String>,
}

/// Transport-level failure, reported alongside an absent result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportFailure {
    pub message: Option<String>,
}

/// What a transport hands back before normalization.
///
/// Both channels are kept as-is; a transport never interprets the payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    pub data: Option<JsonValue>,
    pub error: Option<TransportFailure>,
}

impl RawResponse {
    pub fn success(data: JsonValue) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: Option<String>) -> Self {
        Self {
            data: None,
            error: Some(TransportFailure { message }),
        }
    }
}

/// Transport seam for remote procedure calls.
///
/// Implementations must not retry and must report every failure through
/// [`RawResponse::error`] rather than panicking.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, request: RpcRequest) -> RawResponse;
}

/// Fold both failure channels into one result.
///
/// Resolution order:
/// 1. transport failure → [`InvokeError::Transport`] with its message or the fallback
/// 2. embedded `error` in the payload → [`InvokeError::Application`] with its message or the fallback
/// 3. otherwise the payload (absent data is `null`)
pub fn normalize(raw: RawResponse) -> Result<JsonValue, InvokeError> {
    if let Some(failure) = raw.error {
        return Err(InvokeError::Transport {
            message: message_or_fallback(failure.message.as_deref()),
        });
    }

    let data = raw.data.unwrap_or(JsonValue::Null);
    if let Some(message) = embedded_error(&data) {
        return Err(InvokeError::Application { message });
    }

    Ok(data)
}

/// Extract an embedded application error, following JSON truthiness:
/// `null`, `false`, `0` and `""` mean "no error".
fn embedded_error(data: &JsonValue) -> Option<String> {
    let error = data.get("error")?;
    match error {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::Number(n) if n.as_f64() == Some(0.0) => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(map) => Some(message_or_fallback(
            map.get("message").and_then(JsonValue::as_str),
        )),
        _ => Some(FALLBACK_MESSAGE.to_string()),
    }
}

fn message_or_fallback(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

/// Invokes named remote procedures and returns typed results.
#[derive(Clone)]
pub struct RemoteInvoker {
    transport: Arc<dyn RpcTransport>,
}

impl RemoteInvoker {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Invoke `procedure` with `payload` using the transport's own credential.
    pub async fn invoke<R>(&self, procedure: &str, payload: JsonValue) -> Result<R, InvokeError>
    where
        R: DeserializeOwned,
    {
        self.invoke_as(None, procedure, payload).await
    }

    /// Invoke `procedure` on behalf of the caller holding `credential`.
    pub async fn invoke_as<R>(
        &self,
        credential: Option<&str>,
        procedure: &str,
        payload: JsonValue,
    ) -> Result<R, InvokeError>
    where
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            procedure: procedure.to_string(),
            payload,
            credential: credential.map(str::to_owned),
        };

        let raw = self.transport.call(request).await;
        let data = normalize(raw).inspect_err(|e| {
            tracing::debug!(procedure, error = %e, "remote procedure failed");
        })?;

        serde_json::from_value(data).map_err(|e| InvokeError::Decode {
            procedure: procedure.to_string(),
            reason: e.to_string(),
        })
    }
}

impl core::fmt::Debug for RemoteInvoker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemoteInvoker").finish_non_exhaustive()
    }
}
