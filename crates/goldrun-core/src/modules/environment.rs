//! Sanitizer environment for subject runs.
//!
//! Overrides are computed from a lookup of the caller's environment and
//! applied to each child command; the harness process environment is never
//! modified. Caller settings win: `ASAN_OPTIONS` only gains default keys the
//! caller did not set, and `LSAN_OPTIONS` is only filled in when absent.

use std::path::Path;
use std::process::Command;

pub const ASAN_OPTIONS_KEY: &str = "ASAN_OPTIONS";
pub const LSAN_OPTIONS_KEY: &str = "LSAN_OPTIONS";
pub const DEFAULT_ASAN_OPTIONS: &str =
    "detect_leaks=1:color=always:abort_on_error=0:report_objects=0";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagnosticEnvironment {
    overrides: Vec<(String, String)>,
}

impl DiagnosticEnvironment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Overrides for the current host, read from the process environment.
    /// Windows builds do not use the sanitizer runtime, so nothing is set.
    pub fn for_host(suppressions_file: &Path) -> Self {
        if cfg!(windows) {
            return Self::empty();
        }
        Self::resolve(suppressions_file, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(suppressions_file: &Path, caller_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = Vec::new();

        let caller_asan = caller_env(ASAN_OPTIONS_KEY).filter(|value| !value.is_empty());
        overrides.push((
            ASAN_OPTIONS_KEY.to_string(),
            merge_sanitizer_options(caller_asan.as_deref(), DEFAULT_ASAN_OPTIONS),
        ));

        if suppressions_file.is_file() && caller_env(LSAN_OPTIONS_KEY).is_none() {
            overrides.push((
                LSAN_OPTIONS_KEY.to_string(),
                format!("suppressions={}", suppressions_file.display()),
            ));
        }

        Self { overrides }
    }

    pub fn overrides(&self) -> &[(String, String)] {
        &self.overrides
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn apply(&self, command: &mut Command) {
        for (key, value) in &self.overrides {
            command.env(key, value);
        }
    }
}

/// Merges colon-separated `key=value` sanitizer options. Caller entries are
/// kept verbatim and in order; defaults are appended only for keys the caller
/// did not define.
pub fn merge_sanitizer_options(caller: Option<&str>, defaults: &str) -> String {
    let Some(caller) = caller.filter(|value| !value.is_empty()) else {
        return defaults.to_string();
    };

    let caller_keys = caller
        .split(':')
        .filter_map(|entry| entry.split_once('=').map(|(key, _)| key))
        .collect::<Vec<_>>();

    let mut merged = caller.split(':').collect::<Vec<_>>();
    for entry in defaults.split(':') {
        let key = entry.split_once('=').map_or(entry, |(key, _)| key);
        if !caller_keys.contains(&key) {
            merged.push(entry);
        }
    }
    merged.join(":")
}
