use axum::{Json, http::StatusCode, response::IntoResponse};
use certkeeper_common::views::ApiErrorResponse;
use certkeeper_db::storage::StoreError;
use certkeeper_lifecycle::{ErrorKind, LifecycleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Lifecycle(e) => e.kind(),
            ApiError::Storage(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            ApiError::Storage(StoreError::Conflict { .. }) => ErrorKind::Conflict,
            ApiError::Storage(_) => ErrorKind::Internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        let kind = err.kind();
        ApiErrorResponse {
            code: Some(
                match kind {
                    ErrorKind::NotConfigured => "NotConfigured",
                    ErrorKind::NotFound => "NotFound",
                    ErrorKind::Conflict => "Conflict",
                    ErrorKind::Upstream => "UpstreamError",
                    ErrorKind::Internal => "InternalError",
                }
                .into(),
            ),

            // Everything but internal failures is safe and useful to show.
            message: match kind {
                ErrorKind::Internal => {
                    "Something went wrong on our end. Please try again later.".into()
                }
                _ => err.to_string(),
            },

            #[cfg(debug_assertions)]
            details: Some(err.to_string()),

            #[cfg(not(debug_assertions))]
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!("Error returned by handler: {self}");
        } else {
            tracing::debug!("Error returned by handler: {self}");
        }

        (status_code, Json(Into::<ApiErrorResponse>::into(self))).into_response()
    }
}
