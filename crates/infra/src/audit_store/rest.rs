//! Audit store backed by the hosted platform's REST table endpoint.

use async_trait::async_trait;

use adminhub_audit::{AuditRecord, AuditStore, AuditStoreError, AUDIT_TABLE};

/// Inserts rows with `POST {base_url}/rest/v1/api_logs`.
///
/// Sends the platform public key as both `apikey` and bearer credential and
/// asks for an empty response body.
#[derive(Debug, Clone)]
pub struct RestAuditStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestAuditStore {
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
        format!("{}/rest/v1/{}", self.base_url, AUDIT_TABLE)
    }
}

#[async_trait]
impl AuditStore for RestAuditStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", &self.api_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.api_key)
            .json(&record)
            .send()
            .await
            .map_err(|e| AuditStoreError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let msg = format!("{status}: {body}");
        if status.is_server_error() || status.as_u16() == 429 {
            Err(AuditStoreError::Transient(msg))
        } else {
            Err(AuditStoreError::Permanent(msg))
        }
    }
}
