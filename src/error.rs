use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

#[derive(Debug, ThisError)]
pub enum ChapterError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Could not process the file: {0}")]
    Upload(String),

    #[error("{0}")]
    Persistence(String),

    #[error("Missing request context: {0}")]
    Context(String),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChapterError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChapterError::Validation(_) | ChapterError::Conflict(_) | ChapterError::NotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ChapterError::Upload(_)
            | ChapterError::Persistence(_)
            | ChapterError::Context(_)
            | ChapterError::Database(_)
            | ChapterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to hand back to the caller verbatim.
    fn is_public(&self) -> bool {
        !matches!(
            self,
            ChapterError::Context(_) | ChapterError::Database(_) | ChapterError::Io(_)
        )
    }

    /// Maps a unique-constraint violation on `chapter_name` to a conflict.
    pub fn from_write(err: SqlxError) -> Self {
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            ChapterError::Conflict("Chapter already exists".to_string())
        } else {
            ChapterError::Database(err)
        }
    }
}

impl IntoResponse for ChapterError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if self.is_public() {
            self.to_string()
        } else {
            error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        };
        (status, Json(ApiErrorBody { message })).into_response()
    }
}

/// Body of every failed response.
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub message: String,
}
