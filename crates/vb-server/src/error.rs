// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP error envelope: `{error: {code, message, details?}, request_id}`
//! (spec §6), built directly from a [`vb_error::VbError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vb_error::{ErrorCategory, ErrorCode, VbError};

use crate::middleware::RequestId;

/// A [`VbError`] paired with the request id it occurred under, ready to
/// render as the response envelope.
pub struct ApiError {
    /// Underlying error.
    pub inner: VbError,
    /// Request this error occurred under, if known at construction time.
    pub request_id: Option<RequestId>,
}

impl ApiError {
    /// Wrap `err` with no request id attached yet; [`Self::with_request_id`]
    /// fills it in once the extractor runs.
    pub fn new(err: VbError) -> Self {
        Self {
            inner: err,
            request_id: None,
        }
    }

    /// Attach the request id this error occurred under.
    #[must_use]
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    fn status(&self) -> StatusCode {
        match self.inner.category() {
            ErrorCategory::BadInput => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
            // ExpressionError and Upstream are handled transparently inside
            // the pipeline and should never reach a handler's error path;
            // if one does, treat it as an internal failure rather than
            // inventing a status the taxonomy doesn't define.
            ErrorCategory::ExpressionError | ErrorCategory::Upstream | ErrorCategory::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<VbError> for ApiError {
    fn from(err: VbError) -> Self {
        Self::new(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    request_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = if self.inner.context.is_empty() {
            None
        } else {
            serde_json::to_value(&self.inner.context).ok()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.inner.code,
                message: self.inner.message,
                details,
            },
            request_id: self.request_id.map(|id| id.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
