pub mod errors;

pub use errors::{HarnessError, HarnessErrorCategory, HarnessResult};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Marker separating graded output from auxiliary output.
pub const SENTINEL_TOKEN: &str = "EOS";

/// Output substituted for a subject run that exceeded its time limit.
pub const TIMEOUT_OUTPUT: &str = "TIMEOUT\n";

/// One numbered (input, expected-output) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    pub number: u64,
    pub file_name: String,
    pub input_path: PathBuf,
    pub expected_path: PathBuf,
}

impl Fixture {
    pub fn new(
        number: u64,
        file_name: impl Into<String>,
        input_path: impl Into<PathBuf>,
        expected_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            number,
            file_name: file_name.into(),
            input_path: input_path.into(),
            expected_path: expected_path.into(),
        }
    }
}

impl Display for Fixture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test {}", self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed { exit_code: Option<i32> },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub output: String,
    pub status: ExecutionStatus,
}

impl ExecutionOutcome {
    pub fn completed(output: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            status: ExecutionStatus::Completed { exit_code },
        }
    }

    pub fn timed_out() -> Self {
        Self {
            output: TIMEOUT_OUTPUT.to_string(),
            status: ExecutionStatus::TimedOut,
        }
    }

    pub const fn is_timed_out(&self) -> bool {
        matches!(self.status, ExecutionStatus::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SplitOutput {
    pub primary: String,
    pub trailing: String,
}

/// A line index where expected and actual output differ once trailing
/// whitespace is ignored. Both lines are kept unstripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub line_number: usize,
    pub expected: String,
    pub actual: String,
}

impl Discrepancy {
    pub fn new(line_number: usize, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            line_number,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
