//! Per-route access gate.
//!
//! Wraps a route group with a [`RouteGate`]: the role is resolved only when
//! the gate needs it, and the decision becomes the HTTP outcome.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use adminhub_auth::{AccessDecision, RoleResolver, RoleState, RouteGate, SessionState};

use crate::app::errors;
use crate::context::{RoleContext, SessionContext};

#[derive(Clone)]
pub struct GateState {
    pub gate: RouteGate,
    pub resolver: Arc<RoleResolver>,
}

impl GateState {
    pub fn new(gate: RouteGate, resolver: Arc<RoleResolver>) -> Self {
        Self { gate, resolver }
    }
}

pub async fn gate_middleware(
    State(state): State<GateState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let session = req
        .extensions()
        .get::<SessionContext>()
        .map(|ctx| ctx.state().clone())
        .unwrap_or_else(SessionState::signed_out);

    let location = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let role = if state.gate.needs_role() && session.user.is_some() {
        match state.resolver.resolve(session.session()).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(%location, error = %e, "role resolution failed");
                return errors::invoke_error_to_response(e);
            }
        }
    } else {
        RoleState::anonymous()
    };

    match state.gate.evaluate(&session, &role, &location) {
        AccessDecision::Allow => {
            if state.gate.needs_role() {
                req.extensions_mut().insert(RoleContext::new(role));
            }
            next.run(req).await
        }
        AccessDecision::Pending => {
            (StatusCode::ACCEPTED, Json(json!({ "state": "pending" }))).into_response()
        }
        AccessDecision::Deny(denial) => {
            let target = state.gate.redirect_location(&denial);
            tracing::debug!(%location, %target, "access denied; redirecting");
            Redirect::to(&target).into_response()
        }
    }
}
