use thiserror::Error;

/// Result type alias for Stackzy operations
pub type Result<T> = std::result::Result<T, StackzyError>;

/// Errors that abort an analysis run
///
/// A cache miss is not an error: it is reported as
/// [`CacheLookup::NotFound`](crate::CacheLookup::NotFound).
#[derive(Error, Debug)]
pub enum StackzyError {
    /// Network or remote failure, surfaced verbatim
    #[error("{0}")]
    Transport(String),

    /// The device or the store could not locate the binary
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The decompiler exited non-zero or produced no output
    #[error("decompile failed: {0}")]
    DecompileFailure(String),

    /// The library catalog is missing or empty
    #[error("library catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The run was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid package name, fingerprint or other input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackzyError {
    /// Create a transport error from anything printable
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Returns true if the caller asked for the run to stop
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short machine-friendly name of the error class
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::DecompileFailure(_) => "decompile_failure",
            Self::CatalogUnavailable(_) => "catalog_unavailable",
            Self::Cancelled => "cancelled",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_is_verbatim() {
        let err = StackzyError::transport("Connection reset by peer");
        assert_eq!(err.to_string(), "Connection reset by peer");
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_kind() {
        assert_eq!(StackzyError::Cancelled.kind(), "cancelled");
        assert_eq!(
            StackzyError::DecompileFailure("exit 1".into()).kind(),
            "decompile_failure"
        );
        assert!(StackzyError::Cancelled.is_cancelled());
        assert!(!StackzyError::CatalogUnavailable("empty".into()).is_cancelled());
    }
}
