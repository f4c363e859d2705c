//! Error types surfaced at the crate boundary.
//!
//! Backend calls return a boxed [`StorageError`]; the resolver folds those into
//! [`ExplorerError`] so callers only ever see one opaque failure per fetch.

use thiserror::Error;

/// Error returned by storage backends (listing, presigning).
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorerError {
    /// The backend rejected the listing call or it timed out.
    #[error("Failed to list objects under '{prefix}': {message}")]
    Listing { prefix: String, message: String },

    /// A signed URL could not be issued for one of the listed objects.
    #[error("Failed to generate signed URL for '{key}': {message}")]
    Signing { key: String, message: String },

    #[error("Invalid setting {setting}: {message}")]
    Config {
        setting: &'static str,
        message: String,
    },
}

impl ExplorerError {
    pub(crate) fn listing(prefix: &str, err: StorageError) -> Self {
        ExplorerError::Listing {
            prefix: prefix.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn signing(key: &str, err: StorageError) -> Self {
        ExplorerError::Signing {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn config(setting: &'static str, message: impl Into<String>) -> Self {
        ExplorerError::Config {
            setting,
            message: message.into(),
        }
    }
}
