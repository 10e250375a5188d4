//! API error type and its HTTP mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plant_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::telemetry;

/// Errors returned by request handlers
///
/// The client-facing kinds all render as the same generic 400 body; the
/// detail only reaches the server log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("plant is not registered")]
    PlantNotFound,
    #[error("storage failure: {0}")]
    Storage(StorageError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::PlantNotFound,
            other => Self::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Storage(ref err) => {
                error!(error = %err, "request failed");
                let body = ErrorBody {
                    error: "Internal error",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            client => {
                warn!(reason = %client, "rejected request");
                telemetry::record_invalid_request();
                let body = ErrorBody {
                    error: "Invalid data",
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_plant_not_found() {
        let err = ApiError::from(StorageError::NotFound);
        assert!(matches!(err, ApiError::PlantNotFound));
    }

    #[test]
    fn test_client_errors_are_bad_request() {
        let missing = ApiError::MissingField("moistureLevel").into_response();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let absent = ApiError::PlantNotFound.into_response();
        assert_eq!(absent.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        let err = ApiError::from(StorageError::DatabaseError(sqlx_pool_closed()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn sqlx_pool_closed() -> plant_storage::SqlxError {
        plant_storage::SqlxError::PoolClosed
    }
}
