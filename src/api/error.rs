use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use snafu::Snafu;

use crate::model::ValidationError;
use crate::recorder::ViewError;
use crate::store::StoreError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("{source}"))]
    InvalidView { source: ValidationError },

    #[snafu(display("view storage is unavailable, try again later"))]
    Unavailable { source: StoreError },

    #[snafu(display("view not found"))]
    ViewNotFound,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidView { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ViewNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidView { .. } => "invalid_view",
            ApiError::Unavailable { .. } => "unavailable",
            ApiError::ViewNotFound => "view_not_found",
        }
    }
}

impl From<ViewError> for ApiError {
    fn from(error: ViewError) -> Self {
        match error {
            ViewError::Validation { source, .. } => ApiError::InvalidView { source },
            ViewError::Storage { source, .. } => ApiError::Unavailable { source },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Unavailable { source } = &self {
            tracing::error!(error = %source, "request failed on storage");
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });

        (self.status(), Json(body)).into_response()
    }
}
