//! Error types for rmsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 5=decode, 6=connection, ...)
//! - Retryability flags (only connectivity failures are worth re-polling)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::DecodeError;
use crate::device::{ConnectionError, ConnectionErrorKind};
use crate::recognition::{RecognitionError, RecognitionErrorKind};

/// Result type alias for rmsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Not Found (exit 3)
    ItemNotFound,

    // Validation (exit 4)
    InvalidArgument,
    ConfigError,

    // Decode (exit 5)
    DecodeError,
    InvalidMetadata,
    NotANotebook,

    // Connection (exit 6)
    NotConfigured,
    NotConnected,
    DataChannelDisabled,
    Unsupported,
    TransferFailed,

    // Conflict (exit 7)
    ExistsInTarget,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Recognition (exit 9)
    RecognitionError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DecodeError => "DECODE_ERROR",
            Self::InvalidMetadata => "INVALID_METADATA",
            Self::NotANotebook => "NOT_A_NOTEBOOK",
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::DataChannelDisabled => "DATA_CHANNEL_DISABLED",
            Self::Unsupported => "UNSUPPORTED",
            Self::TransferFailed => "TRANSFER_FAILED",
            Self::ExistsInTarget => "EXISTS_IN_TARGET",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::RecognitionError => "RECOGNITION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::ItemNotFound => 3,
            Self::InvalidArgument | Self::ConfigError => 4,
            Self::DecodeError | Self::InvalidMetadata | Self::NotANotebook => 5,
            Self::NotConfigured
            | Self::NotConnected
            | Self::DataChannelDisabled
            | Self::Unsupported
            | Self::TransferFailed => 6,
            Self::ExistsInTarget => 7,
            Self::IoError | Self::JsonError => 8,
            Self::RecognitionError => 9,
        }
    }

    /// Whether re-polling later may succeed without user action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::DataChannelDisabled | Self::TransferFailed
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in rmsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notebook decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Recognition(#[from] RecognitionError),

    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Invalid metadata for {id}: {message}")]
    InvalidMetadata { id: String, message: String },

    #[error("Item {id} is not a notebook (file type {file_type:?})")]
    NotANotebook { id: String, file_type: String },

    #[error("Untracked file already exists at {}", path.display())]
    ExistsInTarget { id: String, path: PathBuf },

    #[error("Transfer of {id} failed: {message}")]
    Transfer { id: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Decode(_) => ErrorCode::DecodeError,
            Self::Connection(e) => match e.kind {
                ConnectionErrorKind::NotConfigured => ErrorCode::NotConfigured,
                ConnectionErrorKind::NotConnected => ErrorCode::NotConnected,
                ConnectionErrorKind::DataChannelDisabled => ErrorCode::DataChannelDisabled,
                ConnectionErrorKind::Unsupported => ErrorCode::Unsupported,
            },
            Self::Recognition(_) => ErrorCode::RecognitionError,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::InvalidMetadata { .. } => ErrorCode::InvalidMetadata,
            Self::NotANotebook { .. } => ErrorCode::NotANotebook,
            Self::ExistsInTarget { .. } => ErrorCode::ExistsInTarget,
            Self::Transfer { .. } => ErrorCode::TransferFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Connection(e) => Some(
                match e.kind {
                    ConnectionErrorKind::NotConfigured => {
                        "Check the SSH user and key: `rmsync config set user root`, \
                         `rmsync config set ssh-key ~/.ssh/id_remarkable`"
                    }
                    ConnectionErrorKind::NotConnected => {
                        "Make sure the tablet is awake and reachable (USB cable or Wi-Fi), \
                         then retry."
                    }
                    ConnectionErrorKind::DataChannelDisabled => {
                        "Enable the USB web interface on the tablet \
                         (Settings > Storage > USB web interface)."
                    }
                    ConnectionErrorKind::Unsupported => {
                        "This operation is not available on the connected device model."
                    }
                }
                .to_string(),
            ),

            Self::ExistsInTarget { path, .. } => Some(format!(
                "A file rmsync did not create is in the way. Move or delete {} \
                 or point the item elsewhere with `rmsync target set`.",
                path.display()
            )),

            Self::ItemNotFound { id } => Some(format!(
                "No item with ID '{id}' on the device. Use `rmsync list --all` to see item IDs."
            )),

            Self::NotANotebook { .. } => Some(
                "Only handwritten notebooks carry strokes; PDFs and EPUBs have none.".to_string(),
            ),

            Self::Recognition(e) => match e.kind {
                RecognitionErrorKind::Auth => {
                    Some("Check the recognition service credentials.".to_string())
                }
                RecognitionErrorKind::TooLarge => {
                    Some("Split the page or remove strokes before retrying.".to_string())
                }
                RecognitionErrorKind::UnsupportedLanguage => {
                    Some("Pick another language with `--language`.".to_string())
                }
                RecognitionErrorKind::Other => None,
            },

            Self::Config(_) => {
                Some("Inspect the configuration with `rmsync config show`.".to_string())
            }

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Decode(_)
            | Self::InvalidMetadata { .. }
            | Self::Transfer { .. }
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_map_to_classified_codes() {
        let err: Error = ConnectionError::not_connected("timeout").into();
        assert_eq!(err.error_code(), ErrorCode::NotConnected);
        assert!(err.error_code().is_retryable());
        assert_eq!(err.exit_code(), 6);

        let err: Error = ConnectionError::not_configured("denied").into();
        assert_eq!(err.error_code(), ErrorCode::NotConfigured);
        assert!(!err.error_code().is_retryable());
    }

    #[test]
    fn test_conflict_is_not_retryable() {
        let err = Error::ExistsInTarget {
            id: "abc".to_string(),
            path: PathBuf::from("/tmp/x.pdf"),
        };
        assert_eq!(err.exit_code(), 7);
        assert!(!err.error_code().is_retryable());
        assert!(err.hint().unwrap().contains("/tmp/x.pdf"));
    }

    #[test]
    fn test_structured_json_shape() {
        let err = Error::ItemNotFound { id: "abc".to_string() };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "ITEM_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("abc"));
    }
}
