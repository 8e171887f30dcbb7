use actix_web::HttpResponse;

use crate::storage::StorageError;
use crate::ErrorResponse;

/// Failure taxonomy shared by every media operation.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage I/O error: {0}")]
    StorageIo(StorageError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            MediaError::Unauthorized(_) => "Unauthorized",
            MediaError::Validation(_) => "BadRequest",
            MediaError::Conflict(_) => "Conflict",
            MediaError::NotFound(_) => "NotFound",
            MediaError::StorageIo(_) | MediaError::Database(_) => "InternalServerError",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MediaError::Conflict(_))
    }
}

impl From<StorageError> for MediaError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::UndecodableImage(_) | StorageError::InvalidPath(_) => {
                MediaError::Validation(error.to_string())
            }
            other => MediaError::StorageIo(other),
        }
    }
}

impl From<MediaError> for HttpResponse {
    fn from(error: MediaError) -> Self {
        match &error {
            MediaError::Unauthorized(message) => {
                HttpResponse::Unauthorized().json(ErrorResponse::unauthorized(message))
            }
            MediaError::Validation(message) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(message))
            }
            MediaError::Conflict(message) => {
                HttpResponse::Conflict().json(ErrorResponse::conflict(message))
            }
            MediaError::NotFound(message) => {
                HttpResponse::NotFound().json(ErrorResponse::not_found(message))
            }
            // Internal details stay in the log.
            MediaError::StorageIo(_) | MediaError::Database(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("The media operation could not be completed")),
        }
    }
}
