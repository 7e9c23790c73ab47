//! Error types for storage backends, application startup and the HTTP client

use thiserror::Error;

/// Failure of a chunk or record backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored data does not match its record
    #[error("corrupted object {id}: {reason}")]
    Corrupted { id: String, reason: String },

    /// Identifier cannot be used as a backend key
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Fatal errors raised while starting the server
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage initialisation failed: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Failure of the HTTP client transport
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(String),

    /// Unexpected HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::Corrupted {
            id: "abc".to_string(),
            reason: "md5 mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "corrupted object abc: md5 mismatch");
        assert_eq!(StoreError::InvalidKey("../x".into()).to_string(), "invalid storage key: ../x");
    }

    #[test]
    fn test_app_error_from_store_error() {
        let err: AppError = StoreError::Backend("down".into()).into();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(err.to_string(), "storage initialisation failed: backend error: down");
    }

    #[test]
    fn test_client_error_messages() {
        let err = ClientError::Http {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
