// src/engine/error.rs

use std::io;

/// Rejections raised before any process is spawned.
///
/// The `Display` text is exactly what the caller sees in `stderr`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid JSON payload.")]
    InvalidJson,

    #[error("Payload must be an object.")]
    NotAnObject,

    #[error("'code' must be a string.")]
    CodeNotString,

    #[error("Code snapshot is empty.")]
    EmptyCode,

    #[error("Payload too large.")]
    TooLarge,

    #[error("Request body could not be read.")]
    Unreadable,
}

/// An interpreter could not be started (or lost before it produced an exit).
///
/// Recovered by trying the next candidate.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to launch `{interpreter}`: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },

    #[error("`{interpreter}` started without captured {stream}")]
    MissingPipe {
        interpreter: String,
        stream: &'static str,
    },

    #[error("lost track of `{interpreter}` after launch: {source}")]
    Supervision {
        interpreter: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn interpreter(&self) -> &str {
        match self {
            LaunchError::Spawn { interpreter, .. }
            | LaunchError::MissingPipe { interpreter, .. }
            | LaunchError::Supervision { interpreter, .. } => interpreter,
        }
    }
}

/// Failures that end a request without an execution outcome.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("No Python interpreter available (tried {attempts}): {last}")]
    NoInterpreter {
        attempts: usize,
        #[source]
        last: LaunchError,
    },

    #[error("No Python interpreter configured.")]
    NoCandidates,

    #[error("Execution service is shutting down.")]
    ShuttingDown,
}
