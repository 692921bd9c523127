use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::error::Error;

use crate::views;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("ValidationError: {0}")]
    Validation(String),
    #[error("NotFoundError: {0}")]
    NotFound(String),
    #[error("IntegrityError: {0}")]
    Integrity(String),
    #[error("ConflictError: {0}")]
    Conflict(String),
    #[error("StorageError: {0}")]
    Storage(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl CatalogError {
    pub fn status(&self) -> StatusCode {
        use CatalogError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            Integrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Conflict(_) => StatusCode::CONFLICT,
            Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to a browser. Storage failures stay opaque.
    pub fn public_message(&self) -> String {
        use CatalogError::*;
        match self {
            Validation(s) | NotFound(s) | Integrity(s) | Conflict(s) => s.clone(),
            Storage(_) => "something went wrong while talking to the database".to_string(),
        }
    }
}

// SQLite reports constraint failures only through the message text.
impl From<libsql::Error> for CatalogError {
    fn from(error: libsql::Error) -> Self {
        let msg = error.to_string();
        if msg.contains("FOREIGN KEY constraint failed") {
            CatalogError::Integrity("referenced author does not exist".to_string())
        } else if msg.contains("UNIQUE constraint failed") {
            CatalogError::Integrity(msg)
        } else if msg.contains("NOT NULL constraint failed") || msg.contains("CHECK constraint failed") {
            CatalogError::Validation(format!("required field is missing or empty ({})", msg))
        } else {
            CatalogError::Storage(Box::new(error))
        }
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(error: anyhow::Error) -> Self {
        CatalogError::Storage(error.into())
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %crate::unpack_error(&self), "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, views::error_page(status, &self.public_message())).into_response()
    }
}
