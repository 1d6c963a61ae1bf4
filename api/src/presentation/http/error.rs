use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::errors::InstallationError;
use crate::application::use_cases::webhooks::handle_webhook::WebhookError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("error");
        ApiError::new(status, "request_rejected", reason)
    }
}

impl From<InstallationError> for ApiError {
    fn from(err: InstallationError) -> Self {
        let status = match &err {
            InstallationError::InvalidRepository(_)
            | InstallationError::InvalidSlug
            | InstallationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            InstallationError::InstallationNotFound(_) => StatusCode::NOT_FOUND,
            InstallationError::ActiveThemeUninstallBlocked => StatusCode::CONFLICT,
            InstallationError::AuthenticationFailed => StatusCode::FORBIDDEN,
            InstallationError::DownloadFailed(_)
            | InstallationError::HttpStatusError { .. }
            | InstallationError::EmptyResponseBody
            | InstallationError::MissingSourceContent(_) => StatusCode::BAD_GATEWAY,
            InstallationError::ExtractionFailed(_)
            | InstallationError::FilesystemPermission(_)
            | InstallationError::WriteFailed { .. }
            | InstallationError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = ?err, code = err.code(), "request_failed");
        }
        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        let status = match &err {
            WebhookError::MissingInstallation | WebhookError::MissingRepository => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::NotFound => StatusCode::NOT_FOUND,
            WebhookError::InvalidSecret => StatusCode::FORBIDDEN,
            WebhookError::Lookup(_) | WebhookError::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.code(), err.to_string())
    }
}
