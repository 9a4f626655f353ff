//! Error types for the PageTurn core engine
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by domain (API, cache, storage, input) so callers can
//! make an explicit degrade-vs-surface decision instead of relying on
//! side-channel logging.
//!
//! The broad policy (see individual components for specifics):
//! - Cache integrity problems are self-healed and logged, never surfaced.
//! - Cache capacity problems refuse the write and drop the stale entry.
//! - Read-path network failures degrade to empty/absent results.
//! - Write-path network failures leave optimistic local state standing.
//! - Only import and delete failures are allowed to interrupt the user.

use thiserror::Error;

/// Result type alias using our PageTurnError type
pub type Result<T> = std::result::Result<T, PageTurnError>;

/// Main error type for the PageTurn core engine
///
/// Each variant includes descriptive error messages and relevant context.
#[derive(Error, Debug)]
pub enum PageTurnError {
    // ===== API Errors =====

    /// Generic API request failure
    #[error("API request failed: {message}")]
    ApiRequestFailed {
        message: String,
        /// HTTP status code if available
        status_code: Option<u16>,
        /// API endpoint that failed
        endpoint: Option<String>,
    },

    /// API returned invalid or unexpected response format
    #[error("Invalid API response: {message}")]
    InvalidApiResponse {
        message: String,
        /// Response body snippet for debugging
        response_body: Option<String>,
    },

    /// Network connectivity error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        /// Whether this error might be transient
        is_transient: bool,
    },

    /// Operation timed out
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    // ===== Library/Input Errors =====

    /// Import file has an extension the parser does not understand.
    /// Rejected synchronously, before any request is issued.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// No book with the given identifier in the in-memory list
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required field is missing from a parse or upload response
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    // ===== Cache/Storage Errors =====

    /// A cache entry exists but cannot be deserialized. Callers are
    /// expected to invalidate the key and fall through to the network.
    #[error("Corrupt cache entry under '{key}': {reason}")]
    CacheIntegrity { key: String, reason: String },

    /// Database schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    // ===== General Errors =====

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====
    // Automatic conversions from external error types

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl PageTurnError {
    /// Create a BookNotFound error from any displayable identifier
    pub fn not_found<S: ToString>(id: S) -> Self {
        PageTurnError::BookNotFound(id.to_string())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        PageTurnError::InvalidInput(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        PageTurnError::InternalError(message.into())
    }

    /// Create an ApiRequestFailed error
    pub fn api_failed<S: Into<String>>(
        message: S,
        status_code: Option<u16>,
        endpoint: Option<String>,
    ) -> Self {
        PageTurnError::ApiRequestFailed {
            message: message.into(),
            status_code,
            endpoint,
        }
    }

    /// Create a NetworkError
    pub fn network_error<S: Into<String>>(message: S, is_transient: bool) -> Self {
        PageTurnError::NetworkError {
            message: message.into(),
            is_transient,
        }
    }

    /// Check if error is retryable (network errors, timeouts, etc.)
    ///
    /// Returns `true` for transient errors that might succeed on retry:
    /// - Network errors marked as transient
    /// - Timeouts
    /// - 5xx server errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PageTurnError::NetworkError { is_transient: true, .. }
                | PageTurnError::Timeout(_)
                | PageTurnError::ApiRequestFailed { status_code: Some(500..=599), .. }
        )
    }

    /// Check if this error came from the transport rather than the payload
    ///
    /// Transport errors on read paths degrade to empty/absent results; on
    /// the progress write path they downgrade the outcome to local-only.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            PageTurnError::NetworkError { .. }
                | PageTurnError::Timeout(_)
                | PageTurnError::ReqwestError(_)
                | PageTurnError::ApiRequestFailed { .. }
        )
    }

    /// Get user-friendly error message suitable for display
    ///
    /// Only import and delete failures interrupt the user with a blocking
    /// notification; this is the text that notification carries.
    pub fn user_message(&self) -> String {
        match self {
            PageTurnError::UnsupportedFormat(ext) => {
                format!("'{}' files are not supported. Please import an EPUB or TXT file.", ext)
            }
            PageTurnError::Timeout(ms) => {
                format!("The server did not respond within {} seconds. Please try again.", ms / 1000)
            }
            PageTurnError::NetworkError { .. } => {
                "Could not reach the library server. Check your connection and try again.".to_string()
            }
            PageTurnError::ApiRequestFailed { status_code: Some(code), .. } => {
                format!("The library server rejected the request (HTTP {}).", code)
            }
            PageTurnError::BookNotFound(id) => {
                format!("This book (id {}) is no longer in your library.", id)
            }
            _ => self.to_string(),
        }
    }
}

impl From<std::num::ParseIntError> for PageTurnError {
    fn from(err: std::num::ParseIntError) -> Self {
        PageTurnError::InvalidInput(format!("Failed to parse integer: {}", err))
    }
}
