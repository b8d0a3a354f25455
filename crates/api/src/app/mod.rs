//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: platform adapters, role resolver, audit recorder
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use adminhub_auth::{Role, RouteGate};

use crate::gate::{gate_middleware, GateState};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{build_services, AppServices};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let identity_state = middleware::IdentityState {
        identity: services.identity.clone(),
    };
    let audit_state = middleware::AuditState {
        recorder: services.recorder.clone(),
    };

    let gated = |router: Router, gate: RouteGate| {
        let state = GateState::new(gate.with_paths(services.paths.clone()), services.resolver.clone());
        router.route_layer(axum::middleware::from_fn_with_state(state, gate_middleware))
    };

    let session_routes = gated(routes::session_router(), RouteGate::session_only());
    let moderator_routes = gated(routes::moderation_router(), RouteGate::requiring(Role::Moderator));
    let admin_routes = gated(routes::admin_router(), RouteGate::requiring(Role::Admin));
    let owner_routes = gated(routes::owner_router(), RouteGate::requiring(Role::Owner));

    // Session resolution runs first, then audit, then the per-route gate.
    let protected = Router::new()
        .merge(session_routes)
        .merge(moderator_routes)
        .merge(admin_routes)
        .merge(owner_routes)
        .layer(Extension(Arc::new(services.clone())))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    identity_state,
                    middleware::session_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    audit_state,
                    middleware::audit_middleware,
                )),
        );

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth", get(routes::system::sign_in))
        .merge(protected)
}
