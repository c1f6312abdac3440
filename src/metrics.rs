// src/metrics.rs

//! Timing and memory measurement for a single interpreter process.
//!
//! Memory tracking uses the `sysinfo` crate and is best-effort:
//! - Memory is sampled periodically (polling).
//! - Extremely short-lived spikes may not be captured.
//! - If the PID cannot be inspected, tracking degrades gracefully and
//!   reports `None`.
//!
//! Nothing here feeds into the response body; the figures are only logged.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use sysinfo::{Pid, System};

/// Metrics collected for a single run.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    /// Wall-clock duration in milliseconds, launch to settlement.
    pub duration_ms: u128,

    /// Peak RSS in KB (best-effort).
    pub max_rss_kb: Option<u64>,
}

/// Tracks peak memory usage of a child process while it runs.
pub struct MemoryTracker {
    stop: Arc<AtomicBool>,
    max_kb: Arc<AtomicU64>,
}

impl MemoryTracker {
    /// Start sampling `pid` every `sample_every` on a background thread.
    ///
    /// The thread exits on its own once the process disappears or
    /// [`MemoryTracker::stop_and_take`] is called.
    pub fn start(pid_u32: u32, sample_every: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let max_kb = Arc::new(AtomicU64::new(0));

        let stop_clone = Arc::clone(&stop);
        let max_clone = Arc::clone(&max_kb);

        thread::spawn(move || {
            let pid = Pid::from_u32(pid_u32);
            let mut system = System::new();

            while !stop_clone.load(Ordering::Relaxed) {
                if !system.refresh_process(pid) {
                    break;
                }

                match system.process(pid) {
                    // sysinfo reports bytes
                    Some(process) => {
                        max_clone.fetch_max(process.memory() / 1024, Ordering::Relaxed);
                    }
                    None => break,
                }

                thread::sleep(sample_every);
            }
        });

        Self { stop, max_kb }
    }

    /// Stop tracking and return the peak RSS in KB.
    ///
    /// Does not join the sampler thread, so it never blocks the caller.
    /// Returns `None` if no samples were collected.
    pub fn stop_and_take(self) -> Option<u64> {
        self.stop.store(true, Ordering::Relaxed);

        match self.max_kb.load(Ordering::Relaxed) {
            0 => None,
            max => Some(max),
        }
    }
}
