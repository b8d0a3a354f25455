use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::{dto::RoleView, errors, services::AppServices};
use crate::context::SessionContext;

/// GET /me/role - the caller's role, fetched unless a fresh cached value exists.
pub async fn role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.resolver.resolve(session.session()).await {
        Ok(state) => Json(RoleView::from(&state)).into_response(),
        Err(e) => errors::invoke_error_to_response(e),
    }
}

/// POST /me/focus - the dashboard regained focus; revalidate a stale role.
pub async fn focus(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.resolver.focus_regained(session.session()).await {
        Ok(state) => Json(RoleView::from(&state)).into_response(),
        Err(e) => errors::invoke_error_to_response(e),
    }
}
