use axum::{
    routing::{get, post},
    Router,
};

pub mod dashboard;
pub mod me;
pub mod system;

/// Views open to any signed-in caller.
pub fn session_router() -> Router {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/projects/:id", get(dashboard::project))
        .route("/me/role", get(me::role))
        .route("/me/focus", post(me::focus))
}

pub fn moderation_router() -> Router {
    Router::new().route("/moderation", get(dashboard::moderation))
}

pub fn admin_router() -> Router {
    Router::new().route("/admin", get(dashboard::admin))
}

pub fn owner_router() -> Router {
    Router::new().route("/owner", get(dashboard::owner))
}
