use thiserror::Error;

/// Result type alias for external tool invocations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Errors from the external tools (`adb`, `apktool`)
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("{program} exited with {status}: {detail}")]
    Exit {
        program: String,
        status: String,
        detail: String,
    },

    /// The program's output could not be understood
    #[error("unexpected {program} output: {detail}")]
    Parse { program: String, detail: String },

    /// Local I/O error while talking to the program
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for stackzy_core::StackzyError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Launch { .. } => Self::Config(err.to_string()),
            ToolError::Exit { .. } | ToolError::Parse { .. } => Self::Transport(err.to_string()),
            ToolError::Io(e) => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackzy_core::StackzyError;

    #[test]
    fn test_exit_becomes_transport() {
        let err: StackzyError = ToolError::Exit {
            program: "adb".into(),
            status: "exit status: 1".into(),
            detail: "device offline".into(),
        }
        .into();
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.to_string(), "adb exited with exit status: 1: device offline");
    }

    #[test]
    fn test_launch_becomes_config() {
        let err: StackzyError = ToolError::Launch {
            program: "adb".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(err.kind(), "config");
    }
}
