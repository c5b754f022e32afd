use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Malformed caller input (country/city names, dates)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': expected letters, spaces, hyphens, apostrophes or periods (min 2 chars)")]
    InvalidName { field: &'static str, value: String },

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: String, end: String },

    #[error("a date range needs both 'start' and 'end'")]
    IncompleteRange,
}

/// Failure to fetch a document from an external source
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network-level or 5xx failure; retried by the fetcher
    #[error("transient fetch failure for {url}: {reason}")]
    Transient {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// 4xx or structural failure; never retried
    #[error("permanent fetch failure for {url}: {reason}")]
    Permanent {
        url: String,
        status: Option<u16>,
        reason: String,
    },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
        }
    }
}

/// Persistence-layer failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// Failure of one location within an ingestion pass; counted, never fatal to the pass
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no tide readings found at {url}")]
    NoTideReadings { url: String },
}

/// Outcome of a read through the query service that is not a success
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejection of an ingestion trigger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("ingestion pass {0} is already running")]
    AlreadyRunning(uuid::Uuid),
}

/// Application error returned across the HTTP boundary
#[derive(Debug)]
pub enum AppError {
    /// Client input failed validation
    Validation(String),
    /// No stored data for the requested key
    NotFound(String),
    /// Missing or mismatched trigger credential
    Unauthorized(String),
    /// An ingestion pass is already in flight
    Conflict(String),
    /// Persistence failure
    Store(String),
    /// Anything else
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::Store(msg) => write!(f, "Store error: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Validation(_) => "validation_error",
        AppError::NotFound(_) => "not_found",
        AppError::Unauthorized(_) => "unauthorized",
        AppError::Conflict(_) => "conflict",
        AppError::Store(_) => "store_error",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => Self::Validation(v.to_string()),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(v) => v.into(),
            QueryError::NotFound(msg) => Self::NotFound(msg),
            QueryError::Store(s) => s.into(),
        }
    }
}

impl From<TriggerError> for AppError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::Unauthorized(msg) => Self::Unauthorized(msg),
            TriggerError::AlreadyRunning(_) => Self::Conflict(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::NotFound("no data for France/Brest".to_string());
        assert_eq!(error.to_string(), "Not found: no data for France/Brest");
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::Unauthorized("x".to_string())), "unauthorized");
        assert_eq!(error_type_name(&AppError::Validation("x".to_string())), "validation_error");
        assert_eq!(error_type_name(&AppError::NotFound("x".to_string())), "not_found");
    }

    #[test]
    fn test_query_error_mapping() {
        let err: AppError = QueryError::Validation(ValidationError::InvalidDate("x".into())).into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = QueryError::NotFound("nothing".into()).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_trigger_error_mapping() {
        let err: AppError = TriggerError::AlreadyRunning(uuid::Uuid::nil()).into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = TriggerError::Unauthorized("bad token".into()).into();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_fetch_error_classification() {
        let err = FetchError::Transient {
            url: "http://x".into(),
            status: Some(503),
            reason: "Service Unavailable".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));

        let err = FetchError::Permanent {
            url: "http://x".into(),
            status: Some(404),
            reason: "Not Found".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_ingest_error_display() {
        let err = IngestError::NoTideReadings {
            url: "http://tides/brest".into(),
        };
        assert_eq!(err.to_string(), "no tide readings found at http://tides/brest");

        let err: IngestError = FetchError::Permanent {
            url: "http://tides/brest".into(),
            status: Some(404),
            reason: "Not Found".into(),
        }
        .into();
        assert!(err.to_string().starts_with("permanent fetch failure"));
    }

    #[tokio::test]
    async fn test_error_response_statuses() {
        assert_eq!(
            AppError::Unauthorized("Invalid token".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("none".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("busy".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
