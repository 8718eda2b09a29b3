//! JSON envelope and the error-to-status mapping.

use crate::charts::ChartError;
use crate::data::{LoaderError, ProcessorError, UnknownPollutant};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<UnknownPollutant> for ApiError {
    fn from(e: UnknownPollutant) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Loader(LoaderError::Config(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Loader(LoaderError::NoData { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Loader(LoaderError::Processor(_)) | ApiError::Processor(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Chart(ChartError::NoData) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Chart(ChartError::Render(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("{} {}", status, self);
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn statuses_follow_error_kind() {
        let missing = ApiError::from(LoaderError::from(ConfigError::MissingCredentials));
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(missing.to_string().contains("EPA_API_KEY"));

        let no_data = ApiError::from(LoaderError::NoData { errors: vec!["timeout".into()] });
        assert_eq!(no_data.status(), StatusCode::BAD_GATEWAY);

        let bad = ApiError::from(UnknownPollutant("lead".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::from(ChartError::NoData).status(), StatusCode::NOT_FOUND);
    }
}
