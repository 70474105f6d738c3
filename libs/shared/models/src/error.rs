use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error for every handler in the workspace. Client messages are
/// Spanish (`mensaje`), matching the public API contract; scheduling failures
/// additionally carry a stable `codigo` so clients can branch without
/// string-matching.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("{mensaje} ({codigo})")]
    UserFacing { codigo: String, mensaje: String },

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "mensaje": msg }),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "mensaje": msg }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "mensaje": msg }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "mensaje": msg }),
            ),
            AppError::Validation(errores) => (
                StatusCode::BAD_REQUEST,
                json!({ "mensaje": "Datos inválidos", "errores": errores }),
            ),
            AppError::UserFacing { codigo, mensaje } => (
                StatusCode::BAD_REQUEST,
                json!({ "mensaje": mensaje, "codigo": codigo, "esErrorUsuario": true }),
            ),
            // Storage and connectivity details stay in the logs, never in
            // the response body.
            AppError::Internal(msg) | AppError::Database(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "mensaje": "Error en el servidor" }),
                )
            }
        };

        if status != StatusCode::INTERNAL_SERVER_ERROR {
            tracing::debug!("request failed: {} {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
