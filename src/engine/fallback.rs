// src/engine/fallback.rs

use crate::engine::error::ExecError;
use crate::engine::process::{run_candidate, Attempt, RunLimits};
use crate::engine::ExecutionOutcome;

/// Try each candidate in order and return the first outcome from an
/// interpreter that actually launched, along with its name.
///
/// Only launch failures move on to the next candidate. A snippet that
/// crashes, exits nonzero or times out is a real outcome and ends the pass.
/// Each candidate is attempted at most once.
pub async fn run_with_fallback(
    candidates: &[String],
    source: &str,
    limits: RunLimits,
) -> Result<(String, ExecutionOutcome), ExecError> {
    let mut last = None;

    for interpreter in candidates {
        match run_candidate(interpreter, source, limits).await {
            Attempt::Completed(outcome) => return Ok((interpreter.clone(), outcome)),
            Attempt::LaunchFailed(e) => {
                tracing::warn!(interpreter = %interpreter, error = %e, "interpreter unavailable");
                last = Some(e);
            }
        }
    }

    match last {
        Some(last) => Err(ExecError::NoInterpreter {
            attempts: candidates.len(),
            last,
        }),
        None => Err(ExecError::NoCandidates),
    }
}
