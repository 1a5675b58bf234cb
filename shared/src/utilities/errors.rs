use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid value for {variable}: {value}")]
    InvalidConfigValue { variable: String, value: String },
    #[error("Sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Lapin error: {0}")]
    LapinError(#[from] lapin::Error),
    #[error("Kube error: {0}")]
    KubeError(#[from] kube::Error),
    #[error("Serde json error: {0}")]
    SerdejsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation errors, {0}")]
    ValidatorValidationErrors(#[from] validator::ValidationErrors),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ForbiddenError(String),
    #[error("{0}")]
    ConflictError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::NotFoundError(e) => (StatusCode::NOT_FOUND, e),
            Self::ForbiddenError(e) => (StatusCode::FORBIDDEN, e),
            Self::ConflictError(e) => (StatusCode::CONFLICT, e),
            Self::ValidatorValidationErrors(e) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            // A trigger whose row was written but whose event could not be
            // published reports the bus outage; the pending row is left for
            // operational reconciliation.
            Self::LapinError(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            Self::InvalidConfigValue { variable, value } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid value for {variable}: {value}"),
            ),
            Self::SqlxError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::KubeError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::SerdejsonError(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            Self::IoError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}
