// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Environment variable naming the preferred interpreter executable.
pub const PYTHON_OVERRIDE_ENV: &str = "PYTHON_BIN";

/// Wall-clock deadline applied to every run unless configured otherwise.
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// Root configuration loaded from `config.yaml`.
///
/// Every section is optional. A missing file yields the defaults, so the
/// service can start with no configuration at all.
///
/// The environment is consulted exactly once, in [`Config::apply_env`].
/// Nothing downstream reads process-wide state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: Server,

    /// Interpreter selection
    #[serde(default)]
    pub runtime: Runtime,

    /// Deadline, kill escalation and concurrency bound
    #[serde(default)]
    pub limits: Limits,
}

/// Example:
///
/// server:
///   addr: 127.0.0.1:8080
///   max_body_bytes: 1048576
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Largest accepted request body. Bigger bodies get a 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Interpreter configuration.
///
/// Example:
///
/// runtime:
///   python: /opt/python3.12/bin/python3
///   fallbacks: [python3, python]
#[derive(Debug, Clone, Deserialize)]
pub struct Runtime {
    /// Preferred interpreter, tried before the fallbacks.
    #[serde(default)]
    pub python: Option<String>,

    /// Conventional interpreter names, in preference order.
    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<String>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            python: None,
            fallbacks: default_fallbacks(),
        }
    }
}

pub fn default_fallbacks() -> Vec<String> {
    vec!["python3".to_string(), "python".to_string()]
}

/// Execution limits.
///
/// Example:
///
/// limits:
///   timeout_ms: 4000
///   kill_grace_ms: 2000
///   max_concurrent: 8
///   max_output_bytes: 1048576
#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Wall-clock deadline per run, measured from process launch.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long a timed-out process may ignore SIGTERM before it is killed.
    /// Zero disables escalation.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Maximum number of interpreter processes alive at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-stream cap on captured output. The pipe keeps being drained past
    /// the cap, the bytes are just not kept.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            max_concurrent: default_max_concurrent(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_kill_grace_ms() -> u64 {
    2000
}

fn default_max_concurrent() -> usize {
    8
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

impl Limits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn kill_grace(&self) -> Option<Duration> {
        (self.kill_grace_ms > 0).then(|| Duration::from_millis(self.kill_grace_ms))
    }
}

/// A single configuration problem, reported with a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub code: &'static str,
    pub message: String,
}

impl Config {
    /// Load and parse `config.yaml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&raw)
    }

    /// Like [`Config::load`], but a missing file means "use the defaults".
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // An empty document deserialises to null, not to an empty mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Failed to parse YAML config")
    }

    /// Apply environment overrides from an explicit lookup.
    ///
    /// `main` passes `std::env::var` here; tests pass a closure over a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(python) = lookup(PYTHON_OVERRIDE_ENV) {
            if !python.trim().is_empty() {
                self.runtime.python = Some(python);
            }
        }
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.limits.timeout_ms == 0 {
            issues.push(ConfigIssue {
                code: "LIMIT_TIMEOUT_INVALID",
                message: "timeout_ms must be greater than zero".to_string(),
            });
        }

        if self.limits.max_concurrent == 0 {
            issues.push(ConfigIssue {
                code: "LIMIT_CONCURRENCY_INVALID",
                message: "max_concurrent must be greater than zero".to_string(),
            });
        }

        if self.limits.max_output_bytes == 0 {
            issues.push(ConfigIssue {
                code: "LIMIT_OUTPUT_INVALID",
                message: "max_output_bytes must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_bytes == 0 {
            issues.push(ConfigIssue {
                code: "SERVER_BODY_LIMIT_INVALID",
                message: "max_body_bytes must be greater than zero".to_string(),
            });
        }

        if self.runtime.fallbacks.iter().all(|f| f.trim().is_empty()) {
            issues.push(ConfigIssue {
                code: "RUNTIME_FALLBACKS_EMPTY",
                message: "At least one fallback interpreter must be configured".to_string(),
            });
        }

        issues
    }

    /// Validate and turn any issues into a single error.
    pub fn ensure_valid(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            return Ok(());
        }

        let joined = issues
            .iter()
            .map(|i| format!("{}: {}", i.code, i.message))
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration: {}", joined)
    }
}
