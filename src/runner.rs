// src/runner.rs

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::engine::{ExecutionRequest, ExecutionResult, ExecutionService};
use crate::runtime;

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => init_scaffold(Path::new("config.yaml")),

        Command::Serve {
            config,
            addr,
            python,
        } => {
            let mut cfg = load_config(&config)?;

            // CLI overrides
            if let Some(addr) = addr {
                cfg.server.addr = addr;
            }
            if let Some(python) = python {
                cfg.runtime.python = Some(python);
            }
            cfg.ensure_valid()?;

            let service = ExecutionService::from_config(&cfg);
            runtime::serve(&cfg.server, service).await
        }

        Command::Run {
            config,
            python,
            timeout_ms,
            file,
        } => {
            let mut cfg = load_config(&config)?;

            if let Some(python) = python {
                cfg.runtime.python = Some(python);
            }
            if let Some(ms) = timeout_ms {
                cfg.limits.timeout_ms = ms;
            }
            cfg.ensure_valid()?;

            let source = read_source(file.as_deref())?;
            let result = execute_once(&cfg, source).await;

            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.success {
                bail!("Snippet failed with exit code {}", result.exit_code.unwrap_or(1));
            }
            Ok(())
        }
    }
}

/// Config file (or defaults) with environment overrides applied.
fn load_config(path: &Path) -> Result<Config> {
    let mut cfg = Config::load_or_default(path)?;
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

/// Run one snippet through the same path the HTTP handler uses and
/// normalize every ending into an [`ExecutionResult`].
pub async fn execute_once(cfg: &Config, source: String) -> ExecutionResult {
    let req = match ExecutionRequest::new(source) {
        Ok(req) => req,
        Err(e) => return ExecutionResult::from(&e),
    };

    let service = ExecutionService::from_config(cfg);
    match service.execute(&req).await {
        Ok(outcome) => outcome.into(),
        Err(e) => ExecutionResult::from(&e),
    }
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snippet file {:?}", path)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read snippet from stdin")?;
            Ok(buf)
        }
    }
}

/* ---------------- init ---------------- */

fn init_scaffold(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!("{} already exists (skipping)", path.display());
        return Ok(());
    }

    std::fs::write(path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", path))?;
    eprintln!("Created {}", path.display());
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"
server:
  addr: 127.0.0.1:8080
  max_body_bytes: 1048576

runtime:
  # Preferred interpreter. PYTHON_BIN overrides this.
  # python: /usr/local/bin/python3.12
  fallbacks:
    - python3
    - python

limits:
  timeout_ms: 4000
  kill_grace_ms: 2000 # 0 = never force-kill
  max_concurrent: 8
  max_output_bytes: 1048576 # per stream
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn scaffold_parses_to_defaults() {
        let cfg = Config::parse(default_config_yaml()).unwrap();
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.runtime.python, None);
        assert_eq!(cfg.limits.timeout_ms, 4000);
    }

    #[test]
    fn init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("config.yaml");

        init_scaffold(&path).unwrap();
        assert!(path.exists());

        std::fs::write(&path, "limits:\n  timeout_ms: 10\n").unwrap();
        init_scaffold(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap().limits.timeout_ms, 10);
    }

    #[tokio::test]
    async fn blank_snippet_never_reaches_an_interpreter() {
        let mut cfg = Config::default();
        cfg.runtime.fallbacks = vec!["definitely-not-an-interpreter".to_string()];

        let result = execute_once(&cfg, "   ".to_string()).await;
        assert_eq!(result.stderr, "Code snapshot is empty.");
        assert!(!result.success);
    }
}
