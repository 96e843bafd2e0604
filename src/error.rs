use std::path::PathBuf;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures while loading a domain's catalog artifacts at startup
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Artifact not readable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact malformed at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Matrix {artifact} has {found} rows, item table has {expected}")]
    RowMismatch {
        artifact: String,
        expected: usize,
        found: usize,
    },

    #[error("Matrix {artifact} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        artifact: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid artifact {artifact}: {reason}")]
    Malformed { artifact: String, reason: String },

    #[error("Duplicate identifier {0} in item table")]
    DuplicateId(String),

    #[error("Item table is empty")]
    Empty,
}

/// Failures inside the scoring pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("At least {required} items are required, got {given}")]
    InsufficientSeeds { required: usize, given: usize },

    #[error("None of the selected items exist in the catalog")]
    EmptySeed,

    #[error("Vector width {found} does not match matrix width {expected}")]
    Dimension { expected: usize, found: usize },

    #[error("Scoring abandoned after the request timed out")]
    Cancelled,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Domain not available: {0}")]
    DomainUnavailable(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable reason code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Scoring(ScoringError::InsufficientSeeds { .. }) => "insufficient_seeds",
            AppError::Scoring(ScoringError::EmptySeed) => "empty_seed",
            AppError::Scoring(ScoringError::Dimension { .. }) => "dimension_mismatch",
            AppError::Scoring(ScoringError::Cancelled) | AppError::Timeout(_) => "timeout",
            AppError::InvalidBody(_) => "invalid_body",
            AppError::HttpClient(_) | AppError::ExternalApi(_) => "external_api",
            AppError::DomainUnavailable(_) => "domain_unavailable",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::Scoring(ScoringError::InsufficientSeeds { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Scoring(ScoringError::EmptySeed) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::Scoring(ScoringError::Dimension { .. }) => {
                // Only reachable if the loaded snapshot is corrupt.
                tracing::error!(error = %self, "Feature dimension invariant violated");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Scoring(ScoringError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            AppError::DomainUnavailable(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_error_codes() {
        let err = AppError::from(ScoringError::InsufficientSeeds {
            required: 3,
            given: 1,
        });
        assert_eq!(err.code(), "insufficient_seeds");
        assert_eq!(AppError::from(ScoringError::EmptySeed).code(), "empty_seed");
    }

    #[test]
    fn test_insufficient_seeds_is_bad_request() {
        let response = AppError::from(ScoringError::InsufficientSeeds {
            required: 3,
            given: 2,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_dimension_error_hides_details() {
        let response = AppError::from(ScoringError::Dimension {
            expected: 4,
            found: 3,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_timeout_is_service_unavailable() {
        let response = AppError::Timeout(10_000).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = AppError::from(ScoringError::Cancelled);
        assert_eq!(err.code(), "timeout");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
