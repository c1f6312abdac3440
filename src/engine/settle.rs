// src/engine/settle.rs

//! Single-shot settlement of one interpreter run.
//!
//! A run moves `NotStarted -> Running -> Settled`. A launch failure may also
//! settle straight from `NotStarted`. The move into `Settled` is a single
//! compare-and-set and only the first caller wins.
//!
//! The process runner drives its terminal events through one `select!` loop
//! that ends exactly once, so it never races itself here. The state object
//! makes the lifecycle explicit; the single-winner guarantee is what lets it
//! be shared if termination paths are ever split across tasks.

use std::sync::atomic::{AtomicU8, Ordering};

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const SETTLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleState {
    NotStarted,
    Running,
    Settled,
}

#[derive(Debug)]
pub struct Settlement {
    state: AtomicU8,
}

impl Default for Settlement {
    fn default() -> Self {
        Self::new()
    }
}

impl Settlement {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
        }
    }

    pub fn state(&self) -> SettleState {
        match self.state.load(Ordering::Acquire) {
            NOT_STARTED => SettleState::NotStarted,
            RUNNING => SettleState::Running,
            _ => SettleState::Settled,
        }
    }

    /// `NotStarted -> Running`. Returns false if the run already moved on.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move into `Settled`. Returns true only for the first caller.
    pub fn settle(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != SETTLED).then_some(SETTLED)
            })
            .is_ok()
    }
}
