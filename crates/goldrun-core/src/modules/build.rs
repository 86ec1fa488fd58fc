//! Compiles the subject from the C++ sources in the project root.
//!
//! Windows hosts skip compilation and expect a prebuilt executable.

use super::executor::{ExecutorError, MergedCapture};
use crate::domain::{HarnessError, HarnessResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_COMPILER: &str = "clang++";

pub const DEFAULT_COMPILER_FLAGS: [&str; 9] = [
    "-g",
    "-O0",
    "-fno-inline",
    "-std=c++11",
    "-fsanitize=address,leak,undefined",
    "-Wall",
    "-Wextra",
    "-Wpedantic",
    "-Werror=vla",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub compiler: PathBuf,
    pub flags: Vec<String>,
    pub extra_flags: Vec<String>,
    pub sources_dir: PathBuf,
    pub output: PathBuf,
}

impl BuildConfig {
    pub fn new(sources_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            flags: DEFAULT_COMPILER_FLAGS.iter().map(|flag| flag.to_string()).collect(),
            extra_flags: Vec::new(),
            sources_dir: sources_dir.into(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Compiled {
        sources: Vec<PathBuf>,
        compiler_output: String,
    },
    Prebuilt,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no .cpp sources found in '{}'", path.display())]
    NoSources { path: PathBuf },
    #[error("failed to read source directory '{}': {source}", path.display())]
    ReadSources {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch compiler '{}': {source}", path.display())]
    LaunchCompiler {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compilation failed ({status}):\n{output}")]
    CompileFailed { status: String, output: String },
    #[error(
        "prebuilt executable '{}' was not found; compile it manually first, e.g. `cl /Zi /W4 /EHsc /MDd /Fe:pa1.exe *.cpp`",
        path.display()
    )]
    MissingPrebuilt { path: PathBuf },
    #[error(transparent)]
    Capture(#[from] ExecutorError),
}

impl From<BuildError> for HarnessError {
    fn from(error: BuildError) -> Self {
        let message = error.to_string();
        match error {
            BuildError::NoSources { .. } => {
                HarnessError::input_validation("INPUT.BUILD_SOURCES", message)
            }
            BuildError::ReadSources { .. } => {
                HarnessError::io_system("IO.BUILD_SOURCES", message)
            }
            BuildError::LaunchCompiler { .. } => {
                HarnessError::io_system("IO.BUILD_COMPILER", message)
            }
            BuildError::CompileFailed { .. } => {
                HarnessError::computation("RUN.BUILD_COMPILE", message)
            }
            BuildError::MissingPrebuilt { .. } => {
                HarnessError::io_system("IO.SUBJECT_MISSING", message)
            }
            BuildError::Capture(_) => HarnessError::io_system("IO.BUILD_CAPTURE", message),
        }
    }
}

pub fn build_subject(config: &BuildConfig) -> HarnessResult<BuildOutcome> {
    if cfg!(windows) {
        tracing::info!(output = %config.output.display(), "skipping build on Windows");
        return ensure_prebuilt(&config.output)
            .map(|()| BuildOutcome::Prebuilt)
            .map_err(HarnessError::from);
    }
    compile(config).map_err(HarnessError::from)
}

fn ensure_prebuilt(output: &Path) -> Result<(), BuildError> {
    if output.is_file() {
        Ok(())
    } else {
        Err(BuildError::MissingPrebuilt {
            path: output.to_path_buf(),
        })
    }
}

fn compile(config: &BuildConfig) -> Result<BuildOutcome, BuildError> {
    let sources = collect_sources(&config.sources_dir)?;
    if sources.is_empty() {
        return Err(BuildError::NoSources {
            path: config.sources_dir.clone(),
        });
    }

    let mut capture = MergedCapture::new()?;
    let mut command = Command::new(&config.compiler);
    command
        .args(compiler_args(config, &sources))
        .stdout(capture.stdout()?)
        .stderr(capture.stderr()?);

    tracing::info!(
        compiler = %config.compiler.display(),
        source_count = sources.len(),
        output = %config.output.display(),
        "compiling subject"
    );
    let status = command.status().map_err(|source| BuildError::LaunchCompiler {
        path: config.compiler.clone(),
        source,
    })?;
    let compiler_output = capture.read_lossy()?;

    if !status.success() {
        let status = status.code().map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        );
        return Err(BuildError::CompileFailed {
            status,
            output: compiler_output,
        });
    }

    Ok(BuildOutcome::Compiled {
        sources,
        compiler_output,
    })
}

/// Flags, then `-o <output>`, then the sources.
pub fn compiler_args(config: &BuildConfig, sources: &[PathBuf]) -> Vec<OsString> {
    let mut args = Vec::new();
    args.extend(config.flags.iter().map(OsString::from));
    args.extend(config.extra_flags.iter().map(OsString::from));
    args.push(OsString::from("-o"));
    args.push(config.output.clone().into_os_string());
    args.extend(sources.iter().map(|source| source.clone().into_os_string()));
    args
}

/// `*.cpp` files directly inside `dir`, sorted by path.
pub fn collect_sources(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let read_error = |source| BuildError::ReadSources {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "cpp") {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::{BuildConfig, BuildError, collect_sources, compiler_args};
    use std::ffi::OsString;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn default_config_uses_sanitizer_flags() {
        let config = BuildConfig::new("/work", "/work/pa1");
        assert_eq!(config.compiler, PathBuf::from("clang++"));
        assert!(
            config
                .flags
                .contains(&"-fsanitize=address,leak,undefined".to_string())
        );
        assert!(config.extra_flags.is_empty());
    }

    #[test]
    fn compiler_args_place_output_before_sources() {
        let mut config = BuildConfig::new("/work", "/work/pa1");
        config.flags = vec!["-O0".to_string()];
        config.extra_flags = vec!["--target=aarch64-apple-darwin".to_string()];
        let sources = vec![PathBuf::from("/work/a.cpp"), PathBuf::from("/work/b.cpp")];

        let args = compiler_args(&config, &sources);
        let expected = [
            "-O0",
            "--target=aarch64-apple-darwin",
            "-o",
            "/work/pa1",
            "/work/a.cpp",
            "/work/b.cpp",
        ]
        .map(OsString::from);
        assert_eq!(args, expected.to_vec());
    }

    #[test]
    fn collects_only_cpp_files_in_sorted_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        for name in ["main.cpp", "list.cpp", "list.h", "notes.txt"] {
            fs::write(temp.path().join(name), "").expect("file should be written");
        }
        fs::create_dir_all(temp.path().join("nested.cpp")).expect("dir should be created");

        let sources = collect_sources(temp.path()).expect("sources should be listed");
        assert_eq!(
            sources,
            vec![temp.path().join("list.cpp"), temp.path().join("main.cpp")]
        );
    }

    #[test]
    fn missing_source_directory_is_reported() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = collect_sources(&temp.path().join("absent")).expect_err("should fail");
        assert!(matches!(error, BuildError::ReadSources { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::{BuildConfig, BuildOutcome, build_subject};
        use crate::domain::HarnessErrorCategory;
        use std::fs;
        use std::path::PathBuf;
        use tempfile::TempDir;

        fn project_with_source() -> TempDir {
            let temp = TempDir::new().expect("tempdir should be created");
            fs::write(temp.path().join("main.cpp"), "int main() {}\n")
                .expect("source should be written");
            temp
        }

        #[test]
        fn successful_compiler_reports_compiled_sources() {
            let temp = project_with_source();
            let mut config = BuildConfig::new(temp.path(), temp.path().join("pa1"));
            config.compiler = PathBuf::from("true");

            let outcome = build_subject(&config).expect("build should succeed");
            assert_eq!(
                outcome,
                BuildOutcome::Compiled {
                    sources: vec![temp.path().join("main.cpp")],
                    compiler_output: String::new(),
                }
            );
        }

        #[test]
        fn failing_compiler_is_a_computation_error() {
            let temp = project_with_source();
            let mut config = BuildConfig::new(temp.path(), temp.path().join("pa1"));
            config.compiler = PathBuf::from("false");

            let error = build_subject(&config).expect_err("build should fail");
            assert_eq!(error.category(), HarnessErrorCategory::ComputationError);
            assert_eq!(error.placeholder(), "RUN.BUILD_COMPILE");
        }

        #[test]
        fn unknown_compiler_is_an_io_error() {
            let temp = project_with_source();
            let mut config = BuildConfig::new(temp.path(), temp.path().join("pa1"));
            config.compiler = temp.path().join("no-such-compiler");

            let error = build_subject(&config).expect_err("build should fail");
            assert_eq!(error.placeholder(), "IO.BUILD_COMPILER");
        }

        #[test]
        fn project_without_sources_is_rejected() {
            let temp = TempDir::new().expect("tempdir should be created");
            let config = BuildConfig::new(temp.path(), temp.path().join("pa1"));

            let error = build_subject(&config).expect_err("build should fail");
            assert_eq!(error.category(), HarnessErrorCategory::InputValidationError);
            assert_eq!(error.placeholder(), "INPUT.BUILD_SOURCES");
        }
    }
}
