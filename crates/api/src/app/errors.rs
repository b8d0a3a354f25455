use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use adminhub_auth::IdentityError;
use adminhub_rpc::InvokeError;

use crate::context::ErrorDetail;

pub fn invoke_error_to_response(err: InvokeError) -> axum::response::Response {
    match err {
        InvokeError::Transport { message } => {
            json_error(StatusCode::BAD_GATEWAY, "upstream_unavailable", message)
        }
        InvokeError::Application { message } => {
            json_error(StatusCode::BAD_GATEWAY, "upstream_error", message)
        }
        InvokeError::Decode { procedure, reason } => json_error(
            StatusCode::BAD_GATEWAY,
            "invalid_upstream_response",
            format!("{procedure}: {reason}"),
        ),
    }
}

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::Unavailable(msg) => {
            json_error(StatusCode::BAD_GATEWAY, "identity_unavailable", msg)
        }
        IdentityError::InvalidResponse(msg) => {
            json_error(StatusCode::BAD_GATEWAY, "identity_invalid_response", msg)
        }
    }
}

/// JSON error body. The code and message also ride along as a response
/// extension for the audit trail.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    let message = message.into();
    let mut response = (
        status,
        axum::Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response();
    response
        .extensions_mut()
        .insert(ErrorDetail { code, message });
    response
}
