use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use adminhub_audit::{AuditLogEntry, AuditRecorder};
use adminhub_auth::{IdentityProvider, SessionState};
use adminhub_core::ApiKeyId;

use crate::app::errors;
use crate::context::{ErrorDetail, SessionContext};

pub const API_KEY_ID_HEADER: &str = "x-api-key-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

#[derive(Clone)]
pub struct IdentityState {
    pub identity: Arc<dyn IdentityProvider>,
}

/// Resolve the bearer token (if any) into a [`SessionContext`].
///
/// A missing or unknown token is the signed-out state, not an error; the
/// route gate decides what signed-out callers may see.
pub async fn session_middleware(
    State(state): State<IdentityState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = extract_bearer(req.headers()).map(str::to_owned);

    let session = match token {
        None => SessionState::signed_out(),
        Some(token) => match state.identity.session_for(&token).await {
            Ok(Some(session)) => SessionState::signed_in(session),
            Ok(None) => {
                tracing::debug!("bearer token does not identify a live session");
                SessionState::signed_out()
            }
            Err(e) => {
                tracing::warn!(error = %e, "identity provider unavailable");
                return errors::identity_error_to_response(e);
            }
        },
    };

    req.extensions_mut().insert(SessionContext::new(session));
    next.run(req).await
}

#[derive(Clone)]
pub struct AuditState {
    pub recorder: AuditRecorder,
}

/// Record one audit entry per request, after the response is produced.
pub async fn audit_middleware(
    State(state): State<AuditState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let started = Instant::now();

    let action = format!("{} {}", req.method(), req.uri().path());
    let caller_id = req
        .extensions()
        .get::<SessionContext>()
        .and_then(SessionContext::caller_id);
    let api_key_id = api_key_id(req.headers());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip_address = client_ip(req.headers(), peer);

    let response = next.run(req).await;

    let status = response.status();
    let mut entry = AuditLogEntry::builder(action)
        .status(status.as_u16())
        .duration_ms(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

    if let Some(caller_id) = caller_id {
        entry = entry.caller(caller_id);
    }
    if let Some(api_key_id) = api_key_id {
        entry = entry.api_key(api_key_id);
    }
    if let Some(ip) = ip_address {
        entry = entry.ip_address(ip);
    }
    if status.as_u16() >= 400 {
        entry = match response.extensions().get::<ErrorDetail>() {
            Some(detail) => entry.error(detail.code, detail.message.clone()),
            None => entry.error_code(status_code_name(status)),
        };
    }

    state.recorder.record(entry.build());
    response
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn api_key_id(headers: &HeaderMap) -> Option<ApiKeyId> {
    headers
        .get(API_KEY_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Origin address: first `x-forwarded-for` hop, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

fn status_code_name(status: axum::http::StatusCode) -> String {
    status
        .canonical_reason()
        .map(|r| r.to_ascii_lowercase().replace([' ', '-'], "_"))
        .unwrap_or_else(|| format!("http_{}", status.as_u16()))
}
