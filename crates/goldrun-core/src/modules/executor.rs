use super::environment::DiagnosticEnvironment;
use crate::domain::{ExecutionOutcome, Fixture, HarnessError};
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL_MILLIS: u64 = 10;

/// Runs the subject once for a fixture.
pub trait SubjectRunner {
    fn run(&self, fixture: &Fixture) -> Result<ExecutionOutcome, ExecutorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to launch subject '{}': {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open fixture input '{}': {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare output capture: {source}")]
    Capture {
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for subject '{}': {source}", path.display())]
    Wait {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutorError {
    /// Launch failures mean the subject itself is unusable, which aborts the
    /// whole run. Everything else only fails the fixture at hand.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}

impl From<ExecutorError> for HarnessError {
    fn from(error: ExecutorError) -> Self {
        let message = error.to_string();
        match error {
            ExecutorError::Launch { .. } => HarnessError::io_system("IO.SUBJECT_LAUNCH", message),
            ExecutorError::OpenInput { .. } => {
                HarnessError::io_system("IO.FIXTURE_INPUT", message)
            }
            ExecutorError::Capture { .. } | ExecutorError::Wait { .. } => {
                HarnessError::io_system("IO.SUBJECT_RUN", message)
            }
        }
    }
}

/// Spawns the subject as a child process with the fixture input on stdin and
/// stdout/stderr merged into one capture.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
    environment: DiagnosticEnvironment,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            environment: DiagnosticEnvironment::empty(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_environment(mut self, environment: DiagnosticEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn run_input(&self, input_path: &Path) -> Result<ExecutionOutcome, ExecutorError> {
        let input = File::open(input_path).map_err(|source| ExecutorError::OpenInput {
            path: input_path.to_path_buf(),
            source,
        })?;
        let mut capture = MergedCapture::new()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::from(input))
            .stdout(capture.stdout()?)
            .stderr(capture.stderr()?);
        self.environment.apply(&mut command);

        let mut child = command.spawn().map_err(|source| ExecutorError::Launch {
            path: self.program.clone(),
            source,
        })?;

        match wait_with_timeout(&mut child, self.timeout).map_err(|source| {
            ExecutorError::Wait {
                path: self.program.clone(),
                source,
            }
        })? {
            WaitOutcome::Exited(status) => {
                let output = capture.read_lossy()?;
                Ok(ExecutionOutcome::completed(output, status.code()))
            }
            WaitOutcome::TimedOut => {
                tracing::warn!(
                    input = %input_path.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "subject timed out and was killed"
                );
                Ok(ExecutionOutcome::timed_out())
            }
        }
    }
}

impl SubjectRunner for ProcessRunner {
    fn run(&self, fixture: &Fixture) -> Result<ExecutionOutcome, ExecutorError> {
        self.run_input(&fixture.input_path)
    }
}

/// One anonymous temporary file shared by a child's stdout and stderr, so
/// both streams land in write order without pipe back-pressure.
pub(crate) struct MergedCapture {
    file: File,
}

impl MergedCapture {
    pub(crate) fn new() -> Result<Self, ExecutorError> {
        let file = tempfile::tempfile().map_err(|source| ExecutorError::Capture { source })?;
        Ok(Self { file })
    }

    pub(crate) fn stdout(&self) -> Result<Stdio, ExecutorError> {
        self.handle()
    }

    pub(crate) fn stderr(&self) -> Result<Stdio, ExecutorError> {
        self.handle()
    }

    fn handle(&self) -> Result<Stdio, ExecutorError> {
        let clone = self
            .file
            .try_clone()
            .map_err(|source| ExecutorError::Capture { source })?;
        Ok(Stdio::from(clone))
    }

    pub(crate) fn read_lossy(&mut self) -> Result<String, ExecutorError> {
        let mut bytes = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut bytes))
            .map_err(|source| ExecutorError::Capture { source })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
}

/// Polls the child until it exits or the timeout elapses. A timed-out child
/// is killed and reaped before returning.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<WaitOutcome> {
    let started_at = Instant::now();
    let poll_interval = Duration::from_millis(POLL_INTERVAL_MILLIS);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitOutcome::Exited(status));
        }
        if started_at.elapsed() >= timeout {
            // The child may exit between try_wait and kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(WaitOutcome::TimedOut);
        }
        thread::sleep(poll_interval);
    }
}
