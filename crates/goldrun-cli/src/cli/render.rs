//! Terminal rendering: progress line, coloured failure reports, the final
//! summary line and trailing-output listings.

use goldrun_core::domain::Fixture;
use goldrun_core::modules::{FixtureResult, FixtureVerdict, RunObserver, RunSummary};
use std::io::Write;

pub(super) const BAR_WIDTH: usize = 25;
const CLEAR_WIDTH: usize = 80;

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Palette {
    enabled: bool,
}

impl Palette {
    pub(super) const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// `[=====>      ]  24% Running test 6`, prefixed with a carriage return so
/// each update overwrites the previous one.
pub(super) fn format_progress(current: usize, total: usize) -> String {
    let total = total.max(1);
    let filled = (current * BAR_WIDTH / total).min(BAR_WIDTH);
    let head = if filled == 0 {
        ""
    } else if filled < BAR_WIDTH {
        ">"
    } else {
        "="
    };
    let bar = format!(
        "[{}{}{}]",
        "=".repeat(filled.saturating_sub(1)),
        head,
        " ".repeat(BAR_WIDTH - filled)
    );
    let percent = current * 100 / total;
    format!("\r{bar} {percent:>3}% Running test {current}")
}

pub(super) fn clear_progress_line() -> String {
    format!("\r{}\r", " ".repeat(CLEAR_WIDTH))
}

pub(super) fn render_failure(result: &FixtureResult, palette: Palette) -> Option<String> {
    let number = result.fixture.number;
    match &result.verdict {
        FixtureVerdict::Mismatch { discrepancies } => {
            let mut lines = vec![format!("Test {}:", number)];
            for discrepancy in discrepancies {
                lines.push(palette.paint(
                    YELLOW,
                    &format!("Line {:>4}", discrepancy.line_number),
                ));
                lines.push(palette.paint(RED, &format!("- {}", discrepancy.expected)));
                lines.push(palette.paint(GREEN, &format!("+ {}", discrepancy.actual)));
            }
            Some(lines.join("\n"))
        }
        _ => result.failure_text(),
    }
}

pub(super) fn render_summary_line(summary: &RunSummary, palette: Palette) -> String {
    let color = if summary.failure() == 0 {
        GREEN
    } else if summary.success() > 0 {
        YELLOW
    } else {
        RED
    };
    palette.paint(
        color,
        &format!(
            "Finished, Success {}, Fail {}",
            summary.success(),
            summary.failure()
        ),
    )
}

pub(super) fn render_extras(summary: &RunSummary) -> String {
    let mut lines = Vec::new();
    for (number, output) in summary.outputs() {
        lines.push(format!("Test {}:", number));
        if output.trailing.trim().is_empty() {
            lines.push("<NO EXTRA OUTPUT>".to_string());
        } else {
            lines.push(output.trailing.trim_end_matches('\n').to_string());
        }
    }
    lines.join("\n")
}

/// Rewrites the progress line on each fixture start.
pub(super) struct ProgressObserver<W: Write> {
    writer: W,
}

impl<W: Write> ProgressObserver<W> {
    pub(super) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(super) fn finish(mut self) -> std::io::Result<()> {
        write!(self.writer, "{}", clear_progress_line())?;
        self.writer.flush()
    }
}

impl<W: Write> RunObserver for ProgressObserver<W> {
    fn fixture_started(&mut self, index: usize, total: usize, _fixture: &Fixture) {
        // Progress output is best-effort.
        let _ = write!(self.writer, "{}", format_progress(index, total));
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BAR_WIDTH, Palette, ProgressObserver, format_progress, render_extras, render_failure,
        render_summary_line,
    };
    use goldrun_core::domain::{Discrepancy, ExecutionOutcome, Fixture};
    use goldrun_core::modules::{
        ExecutorError, FixtureResult, FixtureVerdict, NoopObserver, RunObserver, SubjectRunner,
        run_fixtures,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct MapRunner(BTreeMap<u64, &'static str>);

    impl SubjectRunner for MapRunner {
        fn run(&self, fixture: &Fixture) -> Result<ExecutionOutcome, ExecutorError> {
            let output = self.0.get(&fixture.number).copied().unwrap_or("");
            Ok(ExecutionOutcome::completed(output, Some(0)))
        }
    }

    fn fixture(number: u64) -> Fixture {
        Fixture::new(
            number,
            format!("{number}.txt"),
            PathBuf::from(format!("in/{number}.txt")),
            PathBuf::from(format!("/nonexistent/out/{number}.txt")),
        )
    }

    #[test]
    fn progress_bar_fills_with_arrow_head() {
        assert_eq!(
            format_progress(1, 4),
            format!("\r[=====>{}]  25% Running test 1", " ".repeat(19))
        );
        assert_eq!(
            format_progress(4, 4),
            format!("\r[{}] 100% Running test 4", "=".repeat(BAR_WIDTH))
        );
        assert_eq!(
            format_progress(1, 100),
            format!("\r[{}]   1% Running test 1", " ".repeat(BAR_WIDTH))
        );
    }

    #[test]
    fn failure_rendering_colours_diff_lines() {
        let result = FixtureResult {
            fixture: fixture(3),
            status: None,
            output: Default::default(),
            verdict: FixtureVerdict::Mismatch {
                discrepancies: vec![Discrepancy::new(1, "3", "4")],
            },
        };

        let plain = render_failure(&result, Palette::new(false)).expect("failure renders");
        assert_eq!(plain, "Test 3:\nLine    1\n- 3\n+ 4");

        let coloured = render_failure(&result, Palette::new(true)).expect("failure renders");
        assert!(coloured.contains("\x1b[31m- 3\x1b[0m"));
        assert!(coloured.contains("\x1b[32m+ 4\x1b[0m"));
    }

    #[test]
    fn summary_colour_depends_on_mix_of_results() {
        let none_pass = run_fixtures(
            &[fixture(1)],
            &MapRunner(BTreeMap::new()),
            &mut NoopObserver,
        )
        .expect("run completes");
        assert_eq!(
            render_summary_line(&none_pass, Palette::new(true)),
            "\x1b[31mFinished, Success 0, Fail 1\x1b[0m"
        );
        assert_eq!(
            render_summary_line(&none_pass, Palette::new(false)),
            "Finished, Success 0, Fail 1"
        );

        let empty = run_fixtures(&[], &MapRunner(BTreeMap::new()), &mut NoopObserver)
            .expect("run completes");
        assert!(render_summary_line(&empty, Palette::new(true)).starts_with("\x1b[32m"));
    }

    #[test]
    fn extras_list_trailing_output_per_fixture() {
        let runner = MapRunner(BTreeMap::from([
            (1, "a\nEOSleak report\n\n"),
            (2, "b\nEOS \n"),
            (3, "c\n"),
        ]));
        let fixtures = [fixture(1), fixture(2), fixture(3)];
        let summary =
            run_fixtures(&fixtures, &runner, &mut NoopObserver).expect("run completes");

        assert_eq!(
            render_extras(&summary),
            "Test 1:\nleak report\nTest 2:\n<NO EXTRA OUTPUT>\nTest 3:\n<NO EXTRA OUTPUT>"
        );
    }

    #[test]
    fn progress_observer_writes_and_clears() {
        let mut buffer = Vec::new();
        {
            let mut observer = ProgressObserver::new(&mut buffer);
            observer.fixture_started(1, 2, &fixture(1));
            observer.fixture_started(2, 2, &fixture(2));
            observer.finish().expect("finish should flush");
        }
        let text = String::from_utf8(buffer).expect("progress is utf-8");
        assert!(text.contains(" 50% Running test 1"));
        assert!(text.contains("100% Running test 2"));
        assert!(text.ends_with('\r'));
    }
}
