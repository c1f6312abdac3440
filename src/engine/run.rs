// src/engine/run.rs

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::Config;
use crate::engine::error::ExecError;
use crate::engine::fallback::run_with_fallback;
use crate::engine::process::RunLimits;
use crate::engine::{ExecutionOutcome, ExecutionRequest};
use crate::execution_id::ExecutionId;
use crate::resolver::resolve_candidates;

/// Shared entry point for HTTP handlers and the CLI.
///
/// Cloning is cheap. The only state shared between runs is the permit pool
/// bounding how many interpreter processes exist at once; buffers, timers
/// and children all belong to a single call.
#[derive(Debug, Clone)]
pub struct ExecutionService {
    candidates: Arc<[String]>,
    limits: RunLimits,
    permits: Arc<Semaphore>,
}

impl ExecutionService {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            candidates: resolve_candidates(&cfg.runtime).into(),
            limits: RunLimits {
                timeout: cfg.limits.timeout(),
                kill_grace: cfg.limits.kill_grace(),
                max_output: cfg.limits.max_output_bytes,
            },
            permits: Arc::new(Semaphore::new(cfg.limits.max_concurrent.max(1))),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    /// Stop admitting runs. Queued and future calls fail with
    /// [`ExecError::ShuttingDown`]; runs already holding a permit finish.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    /// Run one validated request to completion.
    ///
    /// Waiting for a permit does not count against the deadline, which
    /// starts when the interpreter is launched.
    pub async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionOutcome, ExecError> {
        let execution_id = ExecutionId::new();
        let span = tracing::info_span!("execution", execution_id = %execution_id);

        async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| ExecError::ShuttingDown)?;

            let (interpreter, outcome) =
                run_with_fallback(&self.candidates, req.source(), self.limits).await?;

            tracing::debug!(interpreter = %interpreter, "execution finished");
            Ok::<_, ExecError>(outcome)
        }
        .instrument(span)
        .await
    }
}
