use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt::{Debug, Display};

use super::Reply;
use crate::prelude::*;

/// A failed store request: rendered as the JSON envelope with `success: false`.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!("store request failed: {self}");
        } else {
            debug!("store request rejected: {self}");
        }
        (self.status_code, Json(Reply::<()>::failure(self.message))).into_response()
    }
}

#[macro_export]
macro_rules! api_bail {
    ( $status:ident, $fmt:literal $(, $($arg:tt)*)?) => {
        return Err($crate::service::error::ApiError::new(
            axum::http::StatusCode::$status,
            format!($fmt $(, $($arg)*)?),
        ))
    };
}
