//! HTTP transport against the hosted platform's function endpoint.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::invoker::{RawResponse, RpcRequest, RpcTransport};

/// Calls `POST {base_url}/functions/v1/{procedure}` with a JSON body.
///
/// The platform's public key is always sent as `apikey`; the bearer credential
/// is the caller's access token when one is forwarded, otherwise the public key.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, procedure: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, procedure)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, request: RpcRequest) -> RawResponse {
        let bearer = request.credential.as_deref().unwrap_or(&self.api_key);
        let response = self
            .client
            .post(self.endpoint(&request.procedure))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .json(&request.payload)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return RawResponse::failure(Some(e.to_string())),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return RawResponse::failure(Some(e.to_string())),
        };

        if !status.is_success() {
            tracing::debug!(procedure = %request.procedure, %status, "remote procedure returned non-success status");
            let message = serde_json::from_slice::<JsonValue>(&body)
                .ok()
                .and_then(|v| failure_message(&v));
            return RawResponse::failure(message);
        }

        if body.is_empty() {
            return RawResponse::success(JsonValue::Null);
        }

        match serde_json::from_slice(&body) {
            Ok(data) => RawResponse::success(data),
            Err(e) => RawResponse::failure(Some(format!("invalid JSON response: {e}"))),
        }
    }
}

/// Message carried by an error body: `message`, `error`, or `error.message`.
fn failure_message(body: &JsonValue) -> Option<String> {
    body.get("message")
        .and_then(JsonValue::as_str)
        .or_else(|| body.get("error").and_then(JsonValue::as_str))
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(JsonValue::as_str)
        })
        .map(str::to_owned)
}
