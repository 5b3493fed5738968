use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::cache::CacheError;

/// Error payload shape shared by every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// `/api/compare` without a `models` query parameter.
    MissingModelsParam,
    /// Unrecognized path under the API.
    NotFound,
    /// The backing store failed mid-request.
    Store(CacheError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingModelsParam => {
                (StatusCode::BAD_REQUEST, "Missing models parameter")
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            ApiError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(err) = &self {
            tracing::error!(error = %err, "store failure while handling request");
        }

        let (status, message) = self.status_and_message();
        let body = ErrorBody {
            error: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Store(err)
    }
}
