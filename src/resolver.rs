// src/resolver.rs

//! Interpreter candidate resolution.
//!
//! Candidates are built from the runtime section of the configuration only:
//! the preferred interpreter (if any) first, then the conventional fallbacks.
//! Duplicates are removed, keeping the first occurrence, so a preferred
//! `python3` is not attempted twice.

use crate::config::{default_fallbacks, Runtime};

/// Ordered, de-duplicated interpreter candidates.
///
/// Never empty: if the configured fallbacks are all blank the built-in
/// conventional names are used instead.
pub fn resolve_candidates(runtime: &Runtime) -> Vec<String> {
    let mut fallbacks: Vec<&str> = runtime
        .fallbacks
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let builtin = default_fallbacks();
    if fallbacks.is_empty() {
        fallbacks = builtin.iter().map(String::as_str).collect();
    }

    let preferred = runtime
        .python
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut out: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
    for name in preferred.into_iter().chain(fallbacks) {
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(python: Option<&str>, fallbacks: &[&str]) -> Runtime {
        Runtime {
            python: python.map(str::to_string),
            fallbacks: fallbacks.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn no_override_gives_conventional_names() {
        assert_eq!(
            resolve_candidates(&Runtime::default()),
            vec!["python3", "python"]
        );
    }

    #[test]
    fn override_comes_first() {
        let rt = runtime(Some("/opt/py/bin/python3.12"), &["python3", "python"]);
        assert_eq!(
            resolve_candidates(&rt),
            vec!["/opt/py/bin/python3.12", "python3", "python"]
        );
    }

    #[test]
    fn duplicates_keep_first_position() {
        let rt = runtime(Some("python"), &["python3", "python", "python3"]);
        assert_eq!(resolve_candidates(&rt), vec!["python", "python3"]);
    }

    #[test]
    fn empty_override_is_skipped() {
        let rt = runtime(Some("  "), &["python3"]);
        assert_eq!(resolve_candidates(&rt), vec!["python3"]);
    }

    #[test]
    fn blank_fallbacks_fall_back_to_builtin() {
        let rt = runtime(Some("pypy3"), &["", " "]);
        assert_eq!(resolve_candidates(&rt), vec!["pypy3", "python3", "python"]);
    }
}
