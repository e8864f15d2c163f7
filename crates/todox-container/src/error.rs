//! Container error types.
//!
//! Validation failures are terminal: a corrupted or tampered container is
//! reported, never repaired. Every error carries a user-facing message.

use std::path::PathBuf;

use thiserror::Error;
use todox_model::ModelError;

use crate::codec::ImportStage;
use crate::header::HEADER_LEN;

/// Errors produced while encoding, decoding or storing containers.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Fewer bytes than a header.
    #[error("container too small: {len} bytes, header needs {}", HEADER_LEN)]
    TooSmall { len: usize },

    /// First four bytes are not `TDOX`.
    #[error("not a todo container: magic bytes {}", hex::encode(.found))]
    BadMagic { found: [u8; 4] },

    /// Major version newer than this reader understands.
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    /// Stored header checksum differs from the recomputed one.
    #[error("header checksum mismatch: expected {expected}, got {actual}")]
    HeaderChecksumMismatch { expected: String, actual: String },

    /// Payload could not be decoded, decompressed or parsed.
    #[error("corrupt payload: {reason}")]
    CorruptPayload { reason: String },

    /// Stored content checksum differs from the recomputed one.
    #[error("content checksum mismatch: expected {expected}, got {actual}")]
    ContentChecksumMismatch { expected: String, actual: String },

    /// Encoded payload does not fit the 32-bit length field.
    #[error("payload of {len} bytes exceeds the container limit")]
    PayloadTooLarge { len: usize },

    /// File I/O failure.
    #[error("failed to {operation} {}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zlib encoder failed.
    #[error("failed to compress payload")]
    Compression(#[source] std::io::Error),

    /// Envelope could not be serialized.
    #[error("failed to serialize envelope")]
    Serialization(#[source] serde_json::Error),

    /// Multi-document archive could not be read or written.
    #[error("bundle error: {0}")]
    Bundle(String),

    /// Document failed structural validation before export.
    #[error("invalid document: {0}")]
    Model(#[from] ModelError),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    Join(String),
}

impl ContainerError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptPayload {
            reason: reason.into(),
        }
    }

    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// The import stage whose check produced this error, if any.
    pub fn stage(&self) -> Option<ImportStage> {
        match self {
            Self::TooSmall { .. } => Some(ImportStage::Unvalidated),
            Self::BadMagic { .. } => Some(ImportStage::SizeChecked),
            Self::UnsupportedVersion(_) => Some(ImportStage::MagicChecked),
            Self::HeaderChecksumMismatch { .. } => Some(ImportStage::VersionChecked),
            Self::CorruptPayload { .. } => Some(ImportStage::HeaderVerified),
            Self::ContentChecksumMismatch { .. } => Some(ImportStage::Decoded),
            _ => None,
        }
    }

    /// Whether the bytes themselves were rejected (as opposed to I/O trouble).
    pub fn is_validation_failure(&self) -> bool {
        self.stage().is_some()
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::TooSmall { .. } => "Invalid file: too small to be a valid todo file.".to_string(),
            Self::BadMagic { .. } => "Invalid file format: not a todo file.".to_string(),
            Self::UnsupportedVersion(version) => format!(
                "Unsupported file version: {version}. Please update the application."
            ),
            Self::HeaderChecksumMismatch { .. } => {
                "Header checksum verification failed. The file is damaged.".to_string()
            }
            Self::CorruptPayload { .. } => {
                "The file contents could not be read. The file may be corrupted.".to_string()
            }
            Self::ContentChecksumMismatch { .. } => {
                "Content integrity check failed. The file was modified or damaged.".to_string()
            }
            Self::PayloadTooLarge { .. } => "The todo list is too large to export.".to_string(),
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}.", operation, path.display()),
            Self::Compression(_) => "The todo list could not be compressed.".to_string(),
            Self::Serialization(_) => "The todo list could not be prepared for export.".to_string(),
            Self::Bundle(_) => "The archive could not be processed.".to_string(),
            Self::Model(err) => format!("The todo list is invalid: {err}."),
            Self::Join(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

impl From<zip::result::ZipError> for ContainerError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Bundle(err.to_string())
    }
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContainerError::TooSmall { len: 10 };
        assert_eq!(
            format!("{err}"),
            "container too small: 10 bytes, header needs 32"
        );

        let err = ContainerError::BadMagic { found: *b"PK\x03\x04" };
        assert_eq!(format!("{err}"), "not a todo container: magic bytes 504b0304");

        let err = ContainerError::UnsupportedVersion(2);
        assert_eq!(format!("{err}"), "unsupported container version: 2");
    }

    #[test]
    fn test_stages() {
        assert_eq!(
            ContainerError::UnsupportedVersion(2).stage(),
            Some(ImportStage::MagicChecked)
        );
        assert_eq!(ContainerError::corrupt("x").stage(), Some(ImportStage::HeaderVerified));
        assert_eq!(ContainerError::Bundle("x".into()).stage(), None);
    }

    #[test]
    fn test_user_messages() {
        let err = ContainerError::UnsupportedVersion(7);
        assert!(err.user_message().contains("version: 7"));

        let err = ContainerError::ContentChecksumMismatch {
            expected: "a".into(),
            actual: "b".into(),
        };
        assert!(err.user_message().contains("integrity"));

        let err = ContainerError::Compression(std::io::Error::other("encoder closed"));
        assert!(!err.is_validation_failure());
        assert_eq!(err.to_string(), "failed to compress payload");
        assert!(err.user_message().contains("compressed"));
    }
}
