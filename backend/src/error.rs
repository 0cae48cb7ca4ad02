use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong between receiving a CSV and having members to
/// put on a map. Every variant is shown to the user as an inline message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Please upload a CSV file (got '{0}')")]
    Format(String),

    #[error("File is too large. The maximum size is {limit_mb} MB")]
    Size { limit_mb: usize },

    #[error("Too many rows: {rows}. The maximum is {limit}")]
    TooManyRows { rows: usize, limit: usize },

    #[error("{0}")]
    Empty(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    Columns(Vec<String>),

    #[error("{0}")]
    Process(String),
}

impl UploadError {
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Format(_) => "format",
            UploadError::Size { .. } | UploadError::TooManyRows { .. } => "size",
            UploadError::Empty(_) => "empty",
            UploadError::Columns(_) => "columns",
            UploadError::Process(_) => "process",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        })
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Admin token missing or invalid")]
    Unauthorized,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Geocoding service unavailable: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Upload(e) => e.kind(),
            AppError::Upstream(_) => "upstream",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            log::error!("Database failure: {}", e);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        })
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("join error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_error_names_the_limit() {
        let err = UploadError::Size { limit_mb: 5 };
        assert_eq!(err.kind(), "size");
        assert!(err.to_string().contains("5 MB"));
    }

    #[test]
    fn columns_error_lists_missing_headers() {
        let err = UploadError::Columns(vec!["latitude".into(), "longitude".into()]);
        assert_eq!(err.to_string(), "Missing required columns: latitude, longitude");
    }

    #[test]
    fn upload_errors_keep_their_kind_through_app_error() {
        let err = AppError::from(UploadError::Empty("No data rows".into()));
        assert_eq!(err.kind(), "empty");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }
}
