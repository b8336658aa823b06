//! Error types for link creation and resolution
//!
//! [`LinkError`] is the single error surfaced by the repository, the chat
//! resolver and the creation transaction. It renders itself as an HTTP
//! response: validation and collision failures become 4xx JSON bodies with a
//! user-facing message, storage failures become a generic 500 with the
//! details logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors from creating or resolving links.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("A target URL is required.")]
    EmptyTarget,

    /// Manual path failed format validation.
    #[error("Invalid path: {0}")]
    InvalidPath(&'static str),

    #[error("The target is not a valid absolute URL.")]
    InvalidTarget,

    #[error("http[s] links only.")]
    UnsupportedScheme,

    #[error("Don't try to make redirect loops.")]
    RedirectLoop,

    #[error("There already exists a link with that path.")]
    PathTaken,

    #[error("No creator provided.")]
    MissingCreator,

    /// The `chatID` parameter was present but not an integer.
    #[error("Invalid chat ID.")]
    InvalidChatId,

    #[error("Link not found.")]
    NotFound,

    /// Backing store failure; transient and retryable by the caller.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored record could not be (de)serialized.
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// redb reports each phase of a transaction with its own error type; all of
// them are storage failures from the caller's point of view.
macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LinkError {
                fn from(err: $ty) -> Self {
                    LinkError::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl LinkError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkError::EmptyTarget
            | LinkError::InvalidPath(_)
            | LinkError::InvalidTarget
            | LinkError::UnsupportedScheme
            | LinkError::RedirectLoop
            | LinkError::MissingCreator
            | LinkError::InvalidChatId => StatusCode::BAD_REQUEST,
            LinkError::PathTaken => StatusCode::CONFLICT,
            LinkError::NotFound => StatusCode::NOT_FOUND,
            LinkError::Storage(_) | LinkError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LinkError::EmptyTarget => "empty_target",
            LinkError::InvalidPath(_) => "invalid_path",
            LinkError::InvalidTarget => "invalid_target",
            LinkError::UnsupportedScheme => "unsupported_scheme",
            LinkError::RedirectLoop => "redirect_loop",
            LinkError::PathTaken => "path_taken",
            LinkError::MissingCreator => "missing_creator",
            LinkError::InvalidChatId => "invalid_chat_id",
            LinkError::NotFound => "not_found",
            LinkError::Storage(_) | LinkError::Serialization(_) => "internal",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (
            self.status_code(),
            Json(json!({
                "error": self.user_message(),
                "code": self.code()
            })),
        )
            .into_response()
    }
}

/// Failures of the best-effort metadata lookup.
///
/// These are logged and dropped by the enrichment module; they never reach
/// a caller of the creation transaction.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup timed out after {0}ms")]
    Timeout(u128),
}
