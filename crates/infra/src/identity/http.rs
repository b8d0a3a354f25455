//! Identity provider backed by the hosted platform's auth endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use adminhub_auth::{IdentityError, IdentityProvider, Session};
use adminhub_core::CallerId;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

/// Validates an access token with `GET {base_url}/auth/v1/user`.
///
/// 401/403 mean the token is not (or no longer) a live session. Any other
/// failure means the provider could not be asked.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

fn parse_user(body: &[u8]) -> Result<CallerId, IdentityError> {
    let user: UserResponse = serde_json::from_slice(body)
        .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
    user.id
        .parse()
        .map_err(|e: adminhub_core::DomainError| IdentityError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn session_for(&self, access_token: &str) -> Result<Option<Session>, IdentityError> {
        let response = self
            .client
            .get(self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            tracing::debug!(%status, "access token rejected by identity provider");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!("identity provider returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let caller_id = parse_user(&body)?;

        Ok(Some(Session::new(caller_id, access_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_parsed_into_caller_id() {
        let id = CallerId::new();
        let body = format!(r#"{{"id":"{id}","email":"a@example.com","role":"authenticated"}}"#);
        assert_eq!(parse_user(body.as_bytes()).unwrap(), id);
    }

    #[test]
    fn malformed_user_payload_is_invalid_response() {
        assert!(matches!(
            parse_user(br#"{"id":"nope"}"#),
            Err(IdentityError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_user(b"not json"),
            Err(IdentityError::InvalidResponse(_))
        ));
    }
}
