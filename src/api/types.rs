// src/api/types.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::utils::error::CoreError;

/// Uniform envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            status: "success",
            message: message.to_string(),
            data,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: "error",
            message: message.to_string(),
            data: None,
        }
    }
}

/// Maps core errors onto HTTP responses. Template-shape and codec failures
/// are collapsed into generic messages so the caller learns nothing about
/// the stored template.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn public_message(&self) -> String {
        match &self.0 {
            CoreError::Validation(msg) => msg.clone(),
            CoreError::Auth(msg) => msg.clone(),
            CoreError::SessionExpired => "session expired, restart authentication".into(),
            CoreError::DimensionMismatch { .. } => "verification failed".into(),
            CoreError::Cancelled => "operation cancelled".into(),
            _ => "operation failed".into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            CoreError::Validation(_) | CoreError::Cancelled => StatusCode::BAD_REQUEST,
            CoreError::Auth(_)
            | CoreError::SessionExpired
            | CoreError::DimensionMismatch { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal faults get logged here; auth mismatches are an expected
        // outcome and were already recorded by the service layer.
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }

        HttpResponse::build(self.status_code()).json(ApiResponse::error(&self.public_message()))
    }
}
