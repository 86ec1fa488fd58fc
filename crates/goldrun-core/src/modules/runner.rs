use super::catalog::load_fixtures;
use super::comparator::{diff_lines, render_discrepancies};
use super::environment::DiagnosticEnvironment;
use super::executor::{ProcessRunner, SubjectRunner};
use super::splitter::split_output;
use crate::config::HarnessConfig;
use crate::domain::{
    Discrepancy, ExecutionOutcome, ExecutionStatus, Fixture, HarnessError, HarnessResult,
    SplitOutput,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureVerdict {
    Passed,
    MissingExpected { path: PathBuf },
    UnreadableExpected { path: PathBuf, message: String },
    ExecutionFailed { message: String },
    Mismatch { discrepancies: Vec<Discrepancy> },
}

impl FixtureVerdict {
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureResult {
    pub fixture: Fixture,
    pub status: Option<ExecutionStatus>,
    pub output: SplitOutput,
    pub verdict: FixtureVerdict,
}

impl FixtureResult {
    pub const fn passed(&self) -> bool {
        self.verdict.passed()
    }

    /// Plain-text failure detail, `None` for a passing fixture.
    pub fn failure_text(&self) -> Option<String> {
        let number = self.fixture.number;
        match &self.verdict {
            FixtureVerdict::Passed => None,
            FixtureVerdict::MissingExpected { path } => Some(format!(
                "Test {}: missing expected file {}",
                number,
                path.display()
            )),
            FixtureVerdict::UnreadableExpected { path, message } => Some(format!(
                "Test {}: failed to read expected file {}: {}",
                number,
                path.display(),
                message
            )),
            FixtureVerdict::ExecutionFailed { message } => {
                Some(format!("Test {}: execution failed: {}", number, message))
            }
            FixtureVerdict::Mismatch { discrepancies } => {
                let mut lines = vec![format!("Test {}:", number)];
                lines.extend(render_discrepancies(discrepancies));
                Some(lines.join("\n"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub fixture_number: u64,
    pub text: String,
}

/// Aggregate of one complete pass over the catalog. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    total: usize,
    success: usize,
    failure: usize,
    failure_reports: Vec<FailureReport>,
    outputs: BTreeMap<u64, SplitOutput>,
    results: Vec<FixtureResult>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn success(&self) -> usize {
        self.success
    }

    pub fn failure(&self) -> usize {
        self.failure
    }

    pub fn passed(&self) -> bool {
        self.failure == 0
    }

    pub fn failure_reports(&self) -> &[FailureReport] {
        &self.failure_reports
    }

    /// Primary and trailing segments keyed by fixture number.
    pub fn outputs(&self) -> &BTreeMap<u64, SplitOutput> {
        &self.outputs
    }

    pub fn trailing_output(&self, fixture_number: u64) -> Option<&str> {
        self.outputs
            .get(&fixture_number)
            .map(|output| output.trailing.as_str())
    }

    pub fn results(&self) -> &[FixtureResult] {
        &self.results
    }
}

#[derive(Debug, Default)]
struct RunAccumulator {
    success: usize,
    failure: usize,
    failure_reports: Vec<FailureReport>,
    outputs: BTreeMap<u64, SplitOutput>,
    results: Vec<FixtureResult>,
}

impl RunAccumulator {
    fn record(&mut self, result: FixtureResult) {
        match result.failure_text() {
            None => self.success += 1,
            Some(text) => {
                self.failure += 1;
                self.failure_reports.push(FailureReport {
                    fixture_number: result.fixture.number,
                    text,
                });
            }
        }
        self.outputs
            .insert(result.fixture.number, result.output.clone());
        self.results.push(result);
    }

    fn finish(self) -> RunSummary {
        RunSummary {
            total: self.results.len(),
            success: self.success,
            failure: self.failure,
            failure_reports: self.failure_reports,
            outputs: self.outputs,
            results: self.results,
        }
    }
}

/// Progress hooks for the presentation layer.
pub trait RunObserver {
    fn fixture_started(&mut self, _index: usize, _total: usize, _fixture: &Fixture) {}

    fn fixture_finished(&mut self, _result: &FixtureResult) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Runs every fixture in order. Only a fatal executor error (the subject
/// cannot be launched) stops the run; every other problem becomes a failed
/// fixture.
#[tracing::instrument(skip_all, fields(fixture_count = fixtures.len()))]
pub fn run_fixtures(
    fixtures: &[Fixture],
    runner: &dyn SubjectRunner,
    observer: &mut dyn RunObserver,
) -> HarnessResult<RunSummary> {
    let total = fixtures.len();
    let mut accumulator = RunAccumulator::default();

    for (index, fixture) in fixtures.iter().enumerate() {
        observer.fixture_started(index + 1, total, fixture);
        tracing::debug!(fixture = fixture.number, "running fixture");

        let result = match runner.run(fixture) {
            Ok(outcome) => evaluate_fixture(fixture, outcome),
            Err(error) if error.is_fatal() => return Err(HarnessError::from(error)),
            Err(error) => FixtureResult {
                fixture: fixture.clone(),
                status: None,
                output: SplitOutput::default(),
                verdict: FixtureVerdict::ExecutionFailed {
                    message: error.to_string(),
                },
            },
        };

        tracing::debug!(
            fixture = fixture.number,
            passed = result.passed(),
            "fixture finished"
        );
        observer.fixture_finished(&result);
        accumulator.record(result);
    }

    Ok(accumulator.finish())
}

/// Splits the captured output and compares the primary segment with the
/// fixture's expected file, if there is one.
pub fn evaluate_fixture(fixture: &Fixture, outcome: ExecutionOutcome) -> FixtureResult {
    let output = split_output(&outcome.output);
    let verdict = compare_with_expected(fixture, &output.primary);
    FixtureResult {
        fixture: fixture.clone(),
        status: Some(outcome.status),
        output,
        verdict,
    }
}

fn compare_with_expected(fixture: &Fixture, primary: &str) -> FixtureVerdict {
    let path = &fixture.expected_path;
    if !path.is_file() {
        return FixtureVerdict::MissingExpected { path: path.clone() };
    }

    let expected = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(source) => {
            return FixtureVerdict::UnreadableExpected {
                path: path.clone(),
                message: source.to_string(),
            };
        }
    };

    let discrepancies = diff_lines(&expected, primary);
    if discrepancies.is_empty() {
        FixtureVerdict::Passed
    } else {
        FixtureVerdict::Mismatch { discrepancies }
    }
}

/// Loads the catalog and runs it against the configured subject. The input
/// directory and the subject executable are both checked before any fixture
/// runs.
#[tracing::instrument(skip_all, fields(root = %config.root.display()))]
pub fn run_suite(
    config: &HarnessConfig,
    subject_args: &[String],
    observer: &mut dyn RunObserver,
) -> HarnessResult<RunSummary> {
    let fixtures = load_fixtures(&config.input_dir, &config.output_dir, &config.extension)?;
    ensure_subject_exists(config)?;

    let environment = DiagnosticEnvironment::for_host(&config.suppressions_file);
    for (key, value) in environment.overrides() {
        tracing::debug!(key = %key, value = %value, "subject environment override");
    }

    let runner = ProcessRunner::new(&config.executable, config.timeout)
        .with_args(subject_args)
        .with_environment(environment);
    run_fixtures(&fixtures, &runner, observer)
}

pub fn ensure_subject_exists(config: &HarnessConfig) -> HarnessResult<()> {
    if config.executable.is_file() {
        return Ok(());
    }
    Err(HarnessError::io_system(
        "IO.SUBJECT_MISSING",
        format!(
            "subject executable '{}' was not found; build it first",
            config.executable.display()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::{FixtureVerdict, NoopObserver, RunObserver, evaluate_fixture, run_fixtures};
    use crate::domain::{
        Discrepancy, ExecutionOutcome, Fixture, HarnessErrorCategory, TIMEOUT_OUTPUT,
    };
    use crate::modules::executor::{ExecutorError, SubjectRunner};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Replays canned output per fixture number and records call order.
    struct ScriptedRunner {
        outputs: BTreeMap<u64, Scripted>,
        calls: RefCell<Vec<u64>>,
    }

    enum Scripted {
        Output(&'static str),
        Timeout,
        LaunchFailure,
        InputFailure,
    }

    impl ScriptedRunner {
        fn new(outputs: impl IntoIterator<Item = (u64, Scripted)>) -> Self {
            Self {
                outputs: outputs.into_iter().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SubjectRunner for ScriptedRunner {
        fn run(&self, fixture: &Fixture) -> Result<ExecutionOutcome, ExecutorError> {
            self.calls.borrow_mut().push(fixture.number);
            match self.outputs.get(&fixture.number) {
                Some(Scripted::Output(text)) => Ok(ExecutionOutcome::completed(*text, Some(0))),
                Some(Scripted::Timeout) => Ok(ExecutionOutcome::timed_out()),
                Some(Scripted::LaunchFailure) => Err(ExecutorError::Launch {
                    path: PathBuf::from("pa1"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
                Some(Scripted::InputFailure) | None => Err(ExecutorError::OpenInput {
                    path: fixture.input_path.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        started: Vec<(usize, usize, u64)>,
        finished: Vec<(u64, bool)>,
    }

    impl RunObserver for RecordingObserver {
        fn fixture_started(&mut self, index: usize, total: usize, fixture: &Fixture) {
            self.started.push((index, total, fixture.number));
        }

        fn fixture_finished(&mut self, result: &super::FixtureResult) {
            self.finished.push((result.fixture.number, result.passed()));
        }
    }

    #[test]
    fn matching_output_passes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixture = fixture_with_expected(temp.path(), 1, Some("3\n"));

        let result = evaluate_fixture(&fixture, ExecutionOutcome::completed("3\n", Some(0)));
        assert!(result.passed());
        assert_eq!(result.failure_text(), None);
    }

    #[test]
    fn mismatched_output_fails_with_discrepancy() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixture = fixture_with_expected(temp.path(), 1, Some("3\n"));

        let result = evaluate_fixture(&fixture, ExecutionOutcome::completed("4\n", Some(0)));
        assert_eq!(
            result.verdict,
            FixtureVerdict::Mismatch {
                discrepancies: vec![Discrepancy::new(1, "3", "4")]
            }
        );
        assert_eq!(
            result.failure_text().as_deref(),
            Some("Test 1:\nLine    1\n- 3\n+ 4")
        );
    }

    #[test]
    fn only_primary_segment_is_graded() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixture = fixture_with_expected(temp.path(), 3, Some("running..."));

        let result = evaluate_fixture(
            &fixture,
            ExecutionOutcome::completed("running...EOSdebug info\n", Some(0)),
        );
        assert!(result.passed());
        assert_eq!(result.output.primary, "running...");
        assert_eq!(result.output.trailing, "debug info\n");
    }

    #[test]
    fn missing_expected_file_fails_without_comparison() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixture = fixture_with_expected(temp.path(), 7, None);

        let result = evaluate_fixture(&fixture, ExecutionOutcome::completed("", Some(0)));
        assert_eq!(
            result.verdict,
            FixtureVerdict::MissingExpected {
                path: fixture.expected_path.clone()
            }
        );
        let text = result.failure_text().expect("failure should render");
        assert!(text.starts_with("Test 7: missing expected file "));
    }

    #[test]
    fn timeout_output_is_compared_like_any_other() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixture = fixture_with_expected(temp.path(), 2, Some("42\n"));

        let result = evaluate_fixture(&fixture, ExecutionOutcome::timed_out());
        assert_eq!(result.output.primary, TIMEOUT_OUTPUT);
        assert_eq!(
            result.verdict,
            FixtureVerdict::Mismatch {
                discrepancies: vec![Discrepancy::new(1, "42", "TIMEOUT")]
            }
        );
    }

    #[test]
    fn run_continues_past_failures_and_counts_add_up() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixtures = vec![
            fixture_with_expected(temp.path(), 1, Some("3\n")),
            fixture_with_expected(temp.path(), 2, Some("ok\n")),
            fixture_with_expected(temp.path(), 5, Some("4\n")),
            fixture_with_expected(temp.path(), 7, None),
            fixture_with_expected(temp.path(), 9, Some("x\n")),
        ];
        let runner = ScriptedRunner::new([
            (1, Scripted::Output("3\nEOSleaks: none\n")),
            (2, Scripted::Timeout),
            (5, Scripted::Output("5\n")),
            (7, Scripted::Output("anything\n")),
            (9, Scripted::InputFailure),
        ]);
        let mut observer = RecordingObserver::default();

        let summary = run_fixtures(&fixtures, &runner, &mut observer).expect("run completes");
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.success(), 1);
        assert_eq!(summary.failure(), 4);
        assert_eq!(summary.success() + summary.failure(), summary.total());
        assert!(!summary.passed());
        assert_eq!(*runner.calls.borrow(), vec![1, 2, 5, 7, 9]);

        let reported = summary
            .failure_reports()
            .iter()
            .map(|report| report.fixture_number)
            .collect::<Vec<_>>();
        assert_eq!(reported, vec![2, 5, 7, 9]);
        assert!(summary.failure_reports()[3].text.contains("execution failed"));

        assert_eq!(summary.trailing_output(1), Some("leaks: none\n"));
        assert_eq!(summary.outputs()[&2].primary, TIMEOUT_OUTPUT);
        assert_eq!(summary.trailing_output(5), Some(""));

        assert_eq!(
            observer.started,
            vec![(1, 5, 1), (2, 5, 2), (3, 5, 5), (4, 5, 7), (5, 5, 9)]
        );
        assert_eq!(observer.finished[0], (1, true));
        assert_eq!(observer.finished[1], (2, false));
    }

    #[test]
    fn launch_failure_aborts_before_later_fixtures() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixtures = vec![
            fixture_with_expected(temp.path(), 1, Some("1\n")),
            fixture_with_expected(temp.path(), 2, Some("2\n")),
        ];
        let runner = ScriptedRunner::new([
            (1, Scripted::LaunchFailure),
            (2, Scripted::Output("2\n")),
        ]);

        let error = run_fixtures(&fixtures, &runner, &mut NoopObserver)
            .expect_err("launch failure should abort");
        assert_eq!(error.category(), HarnessErrorCategory::IoSystemError);
        assert_eq!(error.placeholder(), "IO.SUBJECT_LAUNCH");
        assert_eq!(*runner.calls.borrow(), vec![1]);
    }

    #[test]
    fn empty_catalog_yields_empty_summary() {
        let runner = ScriptedRunner::new(Vec::<(u64, Scripted)>::new());
        let summary = run_fixtures(&[], &runner, &mut NoopObserver).expect("run completes");
        assert_eq!(summary.total(), 0);
        assert!(summary.passed());
        assert!(summary.failure_reports().is_empty());
    }

    #[test]
    fn repeated_runs_produce_identical_summaries() {
        let temp = TempDir::new().expect("tempdir should be created");
        let fixtures = vec![
            fixture_with_expected(temp.path(), 1, Some("3\n")),
            fixture_with_expected(temp.path(), 2, Some("3\n")),
        ];
        let runner = ScriptedRunner::new([
            (1, Scripted::Output("3\n")),
            (2, Scripted::Output("4\nEOS\n")),
        ]);

        let first = run_fixtures(&fixtures, &runner, &mut NoopObserver).expect("first run");
        let second = run_fixtures(&fixtures, &runner, &mut NoopObserver).expect("second run");
        assert_eq!(first, second);
    }

    fn fixture_with_expected(root: &Path, number: u64, expected: Option<&str>) -> Fixture {
        let file_name = format!("{number}.txt");
        let fixture = Fixture::new(
            number,
            file_name.clone(),
            root.join("in").join(&file_name),
            root.join("out").join(&file_name),
        );
        write_file(&fixture.input_path, "");
        if let Some(content) = expected {
            write_file(&fixture.expected_path, content);
        }
        fixture
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be created");
        }
        fs::write(path, content).expect("file should be written");
    }
}
