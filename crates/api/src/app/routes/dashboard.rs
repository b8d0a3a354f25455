use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::context::{RoleContext, SessionContext};

fn caller(session: &SessionContext) -> Option<String> {
    session.caller_id().map(|id| id.to_string())
}

pub async fn home(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    Json(json!({
        "page": "dashboard",
        "caller_id": caller(&session),
    }))
}

pub async fn project(
    Path(id): Path<String>,
    Extension(session): Extension<SessionContext>,
) -> impl IntoResponse {
    Json(json!({
        "page": "project",
        "project_id": id,
        "caller_id": caller(&session),
    }))
}

fn role_page(page: &'static str, session: &SessionContext, role: &RoleContext) -> Json<serde_json::Value> {
    Json(json!({
        "page": page,
        "caller_id": caller(session),
        "role": role.state().role.as_ref().map(|r| r.as_str().to_string()),
    }))
}

pub async fn moderation(
    Extension(session): Extension<SessionContext>,
    Extension(role): Extension<RoleContext>,
) -> impl IntoResponse {
    role_page("moderation", &session, &role)
}

pub async fn admin(
    Extension(session): Extension<SessionContext>,
    Extension(role): Extension<RoleContext>,
) -> impl IntoResponse {
    role_page("admin", &session, &role)
}

pub async fn owner(
    Extension(session): Extension<SessionContext>,
    Extension(role): Extension<RoleContext>,
) -> impl IntoResponse {
    role_page("owner", &session, &role)
}
