use serde::Serialize;

pub mod error;
pub mod fallback;
pub mod process;
pub mod run;
pub mod settle;
pub mod validate;

pub use error::{ExecError, LaunchError, RequestError};
pub use run::ExecutionService;
pub use validate::parse_request;

/* ---------------- request ---------------- */

/// A snippet accepted for execution. Never blank.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    source: String,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>) -> Result<Self, RequestError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(RequestError::EmptyCode);
        }
        Ok(Self { source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/* ---------------- outcome ---------------- */

/// What one launched interpreter produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    /// 0 on clean exit, the process's own code otherwise, 1 on timeout.
    pub exit_code: i32,
    pub timed_out: bool,
}

/* ---------------- response ---------------- */

/// The fixed response shape returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ExecutionResult {
    /// Error-shaped response: empty stdout, the detail in stderr, exit code 1.
    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: detail.into(),
            exit_code: Some(1),
            success: false,
        }
    }
}

impl From<ExecutionOutcome> for ExecutionResult {
    fn from(outcome: ExecutionOutcome) -> Self {
        Self {
            success: outcome.exit_code == 0,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exit_code: Some(outcome.exit_code),
        }
    }
}

impl From<&RequestError> for ExecutionResult {
    fn from(err: &RequestError) -> Self {
        Self::failure(err.to_string())
    }
}

impl From<&ExecError> for ExecutionResult {
    fn from(err: &ExecError) -> Self {
        Self::failure(err.to_string())
    }
}
