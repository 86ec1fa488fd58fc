pub mod build;
pub mod catalog;
pub mod comparator;
pub mod environment;
pub mod executor;
pub mod report;
pub mod runner;
pub mod splitter;

pub use build::{BuildConfig, BuildOutcome, build_subject};
pub use catalog::load_fixtures;
pub use comparator::{diff_lines, render_discrepancies};
pub use environment::DiagnosticEnvironment;
pub use executor::{ExecutorError, ProcessRunner, SubjectRunner};
pub use report::{RunReport, build_report, write_report};
pub use runner::{
    FailureReport, FixtureResult, FixtureVerdict, NoopObserver, RunObserver, RunSummary,
    run_fixtures, run_suite,
};
pub use splitter::split_output;
