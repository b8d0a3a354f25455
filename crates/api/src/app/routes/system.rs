use axum::{extract::Query, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub redirect: Option<String>,
}

/// Sign-in entry point. Sign-in itself happens at the identity provider; this
/// only tells the client where to return afterwards.
pub async fn sign_in(Query(query): Query<SignInQuery>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "sign_in",
        "redirect": query.redirect.unwrap_or_else(|| "/".to_string()),
    }))
}
