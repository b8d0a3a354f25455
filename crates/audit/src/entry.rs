use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use adminhub_core::{ApiKeyId, CallerId};

use crate::redaction::redact_json_value;

/// Table (and REST resource) audit rows are appended to.
pub const AUDIT_TABLE: &str = "api_logs";

/// One security-relevant event. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    caller_id: Option<CallerId>,
    api_key_id: Option<ApiKeyId>,
    ip_address: Option<String>,
    action: String,
    success: bool,
    status_code: u16,
    error_code: Option<String>,
    error_message: Option<String>,
    request_body: Option<JsonValue>,
    duration_ms: Option<u64>,
}

impl AuditLogEntry {
    pub fn builder(action: impl Into<String>) -> AuditLogBuilder {
        AuditLogBuilder::new(action)
    }

    pub fn caller_id(&self) -> Option<CallerId> {
        self.caller_id
    }

    pub fn api_key_id(&self) -> Option<ApiKeyId> {
        self.api_key_id
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn request_body(&self) -> Option<&JsonValue> {
        self.request_body.as_ref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }
}

#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    caller_id: Option<CallerId>,
    api_key_id: Option<ApiKeyId>,
    ip_address: Option<String>,
    action: String,
    success: Option<bool>,
    status_code: u16,
    error_code: Option<String>,
    error_message: Option<String>,
    request_body: Option<JsonValue>,
    duration_ms: Option<u64>,
}

impl AuditLogBuilder {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            caller_id: None,
            api_key_id: None,
            ip_address: None,
            action: action.into(),
            success: None,
            status_code: 200,
            error_code: None,
            error_message: None,
            request_body: None,
            duration_ms: None,
        }
    }

    pub fn caller(mut self, caller_id: CallerId) -> Self {
        self.caller_id = Some(caller_id);
        self
    }

    pub fn api_key(mut self, api_key_id: ApiKeyId) -> Self {
        self.api_key_id = Some(api_key_id);
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// HTTP-equivalent status. Success defaults to `status < 400` unless set.
    pub fn status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }

    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Request payload; credentials inside it are redacted here.
    pub fn request_body(mut self, mut body: JsonValue) -> Self {
        redact_json_value(&mut body);
        self.request_body = Some(body);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn build(self) -> AuditLogEntry {
        AuditLogEntry {
            success: self.success.unwrap_or(self.status_code < 400),
            caller_id: self.caller_id,
            api_key_id: self.api_key_id,
            ip_address: self.ip_address,
            action: self.action,
            status_code: self.status_code,
            error_code: self.error_code,
            error_message: self.error_message,
            request_body: self.request_body,
            duration_ms: self.duration_ms,
        }
    }
}

/// Insert row for the audit table.
///
/// Every optional column is always present; absent values serialize as
/// explicit `null` (no field is ever skipped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub user_id: Option<Uuid>,
    pub api_key_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub action: String,
    pub success: bool,
    pub status_code: i32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub request_body: Option<JsonValue>,
    pub duration_ms: Option<i64>,
}

impl From<AuditLogEntry> for AuditRecord {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            user_id: entry.caller_id.map(Uuid::from),
            api_key_id: entry.api_key_id.map(Uuid::from),
            ip_address: entry.ip_address,
            action: entry.action,
            success: entry.success,
            status_code: i32::from(entry.status_code),
            error_code: entry.error_code,
            error_message: entry.error_message,
            request_body: entry.request_body,
            duration_ms: entry
                .duration_ms
                .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
        }
    }
}
