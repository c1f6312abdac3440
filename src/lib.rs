//! pyexec: run untrusted Python snippets in a child interpreter with a hard
//! wall-clock deadline, falling back across candidate interpreters.

pub mod cli;
pub mod config;
pub mod engine;
pub mod execution_id;
pub mod metrics;
pub mod resolver;
pub mod runner;
pub mod runtime;
