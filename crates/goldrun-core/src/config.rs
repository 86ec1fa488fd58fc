//! Harness configuration and the default project layout.
//!
//! A project root holds the C++ sources, the compiled subject, an optional
//! leak-sanitizer suppression file and the `tests/in` / `tests/out` fixture
//! directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INPUT_SUBDIR: &str = "tests/in";
pub const DEFAULT_OUTPUT_SUBDIR: &str = "tests/out";
pub const DEFAULT_FIXTURE_EXTENSION: &str = "txt";
pub const DEFAULT_SUPPRESSIONS_FILE: &str = "lsan.supp";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const fn default_executable_name() -> &'static str {
    if cfg!(windows) { "pa1.exe" } else { "pa1" }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub root: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extension: String,
    pub executable: PathBuf,
    pub timeout: Duration,
    pub suppressions_file: PathBuf,
}

impl HarnessConfig {
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            input_dir: root.join(DEFAULT_INPUT_SUBDIR),
            output_dir: root.join(DEFAULT_OUTPUT_SUBDIR),
            extension: DEFAULT_FIXTURE_EXTENSION.to_string(),
            executable: root.join(default_executable_name()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            suppressions_file: root.join(DEFAULT_SUPPRESSIONS_FILE),
            root,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_root(".")
    }
}

/// Joins relative paths onto `base`; absolute paths pass through.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
