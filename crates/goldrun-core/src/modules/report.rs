use super::runner::{FixtureVerdict, RunSummary};
use crate::config::HarnessConfig;
use crate::domain::{ExecutionStatus, HarnessError, HarnessResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub input_dir: String,
    pub output_dir: String,
    pub executable: String,
    pub timeout_secs: f64,
    pub fixture_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub fixtures: Vec<FixtureReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureReport {
    pub number: u64,
    pub file_name: String,
    pub passed: bool,
    pub execution: Option<ExecutionStatus>,
    pub verdict: FixtureVerdict,
    pub trailing_output: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    SerializeReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ReportError> for HarnessError {
    fn from(error: ReportError) -> Self {
        let message = error.to_string();
        match error {
            ReportError::ReportDirectory { .. } | ReportError::WriteReport { .. } => {
                HarnessError::io_system("IO.REPORT_FILESYSTEM", message)
            }
            ReportError::SerializeReport { .. } => {
                HarnessError::internal("SYS.REPORT_SERIALIZE", message)
            }
        }
    }
}

pub fn build_report(config: &HarnessConfig, summary: &RunSummary) -> RunReport {
    let fixtures = summary
        .results()
        .iter()
        .map(|result| FixtureReport {
            number: result.fixture.number,
            file_name: result.fixture.file_name.clone(),
            passed: result.passed(),
            execution: result.status,
            verdict: result.verdict.clone(),
            trailing_output: result.output.trailing.clone(),
        })
        .collect();

    RunReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: summary.passed(),
        input_dir: normalize_path(&config.input_dir),
        output_dir: normalize_path(&config.output_dir),
        executable: normalize_path(&config.executable),
        timeout_secs: config.timeout.as_secs_f64(),
        fixture_count: summary.total(),
        success_count: summary.success(),
        failure_count: summary.failure(),
        fixtures,
    }
}

pub fn write_report(report_path: &Path, report: &RunReport) -> HarnessResult<()> {
    write_report_file(report_path, report).map_err(HarnessError::from)
}

fn write_report_file(report_path: &Path, report: &RunReport) -> Result<(), ReportError> {
    if let Some(parent_dir) = report_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| ReportError::ReportDirectory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| ReportError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| ReportError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
