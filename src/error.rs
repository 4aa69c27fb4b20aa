//! Error types for cache operations.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cache operations.
///
/// Every error is returned to the immediate caller. Nothing in this crate
/// retries or falls back to another backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection URI could not be parsed or carries an invalid option.
    #[error("Invalid connection URI: {0}")]
    InvalidUri(String),

    /// No driver is registered for the URI scheme.
    #[error("Unsupported cache scheme: '{0}'")]
    UnsupportedScheme(String),

    /// A driver constructor failed. `source` is the constructor's own error.
    #[error("Failed to initialize '{scheme}' cache backend: {source}")]
    BackendInit {
        scheme: String,
        #[source]
        source: Box<Error>,
    },

    /// Backend unreachable or credentials rejected while connecting.
    #[error("Connection error: {0}")]
    Connect(String),

    /// Key absent or expired. Carries the caller-supplied key.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored value cannot be parsed as the requested primitive.
    #[error("Type mismatch for key '{key}': stored value is not a valid {expected}")]
    TypeMismatch { key: String, expected: ValueType },

    /// Stored bytes are not valid structured data for the requested shape.
    #[error("Deserialization error: {0}")]
    Decode(String),

    /// Value could not be serialized on write.
    #[error("Serialization error: {0}")]
    Encode(String),

    /// The operation's context was cancelled.
    #[error("Operation canceled")]
    Canceled,

    /// The operation's context deadline passed.
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    /// The cache instance has been closed.
    #[error("Cache instance is closed")]
    Closed,

    /// Backend failure after construction (network, protocol, server error).
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Primitive type requested by a typed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "UTF-8 string"),
            ValueType::Int => write!(f, "64-bit integer"),
            ValueType::Float => write!(f, "64-bit float"),
            ValueType::Bool => write!(f, "boolean"),
        }
    }
}

impl Error {
    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Unwrap `BackendInit` down to the constructor's error.
    pub fn root(&self) -> &Error {
        match self {
            Error::BackendInit { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUri(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_init_keeps_source() {
        let err = Error::BackendInit {
            scheme: "redis".to_string(),
            source: Box::new(Error::Connect("refused".to_string())),
        };

        assert!(matches!(err.root(), Error::Connect(msg) if msg == "refused"));
        assert_eq!(
            err.to_string(),
            "Failed to initialize 'redis' cache backend: Connection error: refused"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::TypeMismatch {
            key: "user:1".to_string(),
            expected: ValueType::Int,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch for key 'user:1': stored value is not a valid 64-bit integer"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("k".to_string()).is_not_found());
        assert!(!Error::Closed.is_not_found());
    }
}
