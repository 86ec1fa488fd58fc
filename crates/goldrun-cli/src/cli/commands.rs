use super::CliError;
use super::helpers::{confirm, current_working_dir};
use super::render::{
    Palette, ProgressObserver, render_extras, render_failure, render_summary_line,
};
use anyhow::Context;
use goldrun_core::config::{
    DEFAULT_FIXTURE_EXTENSION, DEFAULT_TIMEOUT_SECS, HarnessConfig, resolve_path,
};
use goldrun_core::modules::{
    BuildConfig, BuildOutcome, NoopObserver, RunSummary, build_report, build_subject,
    load_fixtures, run_suite, write_report,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

const EXTRAS_PROMPT: &str = "Would you like to see extra info (y/n): ";

#[derive(clap::Args)]
pub(super) struct ProjectArgs {
    /// Project root holding the sources, the subject and the fixtures
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Fixture input directory [default: <root>/tests/in]
    #[arg(long)]
    in_dir: Option<PathBuf>,

    /// Expected output directory [default: <root>/tests/out]
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Fixture file extension
    #[arg(long, default_value = DEFAULT_FIXTURE_EXTENSION)]
    ext: String,

    /// Subject executable [default: <root>/pa1]
    #[arg(long)]
    exec: Option<PathBuf>,

    /// Argument passed to the subject before stdin is fed (repeatable)
    #[arg(long = "exec-arg", allow_hyphen_values = true)]
    exec_args: Vec<String>,
}

impl ProjectArgs {
    fn to_config(&self, working_dir: &Path) -> HarnessConfig {
        let root = resolve_path(working_dir, &self.root);
        let mut config = HarnessConfig::for_root(&root);
        if let Some(in_dir) = &self.in_dir {
            config.input_dir = resolve_path(working_dir, in_dir);
        }
        if let Some(out_dir) = &self.out_dir {
            config.output_dir = resolve_path(working_dir, out_dir);
        }
        if let Some(exec) = &self.exec {
            config.executable = resolve_path(working_dir, exec);
        }
        config.extension = self.ext.clone();
        tracing::debug!(
            root = %config.root.display(),
            input_dir = %config.input_dir.display(),
            output_dir = %config.output_dir.display(),
            executable = %config.executable.display(),
            "resolved harness configuration"
        );
        config
    }
}

#[derive(clap::Args)]
pub(super) struct CompilerArgs {
    /// C++ compiler used to build the subject
    #[arg(long, default_value = "clang++")]
    compiler: PathBuf,

    /// Extra compiler flag, e.g. --flag=--target=aarch64-apple-darwin (repeatable)
    #[arg(long = "flag", allow_hyphen_values = true)]
    flags: Vec<String>,
}

impl CompilerArgs {
    fn to_build_config(&self, config: &HarnessConfig) -> BuildConfig {
        let mut build = BuildConfig::new(&config.root, &config.executable);
        build.compiler = self.compiler.clone();
        build.extra_flags = self.flags.clone();
        build
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum ExtrasMode {
    Prompt,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Auto => is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    compiler: CompilerArgs,

    /// Seconds each fixture may run before the subject is killed
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// Use the existing subject instead of compiling it first
    #[arg(long)]
    no_build: bool,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Whether to show each fixture's output after the sentinel
    #[arg(long, value_enum, default_value_t = ExtrasMode::Prompt)]
    extras: ExtrasMode,

    /// Colour diff and summary lines
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,
}

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    compiler: CompilerArgs,
}

#[derive(clap::Args)]
pub(super) struct ListArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

pub(super) fn run_run_command(args: RunArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let mut config = args.project.to_config(&working_dir);
    config.timeout = Duration::from_secs(args.timeout_secs);

    if !args.no_build {
        compile_subject(&args.compiler.to_build_config(&config))?;
    }

    let fixtures = load_fixtures(&config.input_dir, &config.output_dir, &config.extension)?;
    if fixtures.is_empty() {
        println!(
            "No fixture inputs found ({}/*.{})",
            config.input_dir.display(),
            config.extension
        );
        return Ok(0);
    }

    let interactive = std::io::stdout().is_terminal();
    let palette = Palette::new(args.color.enabled(interactive));

    println!("Running:");
    let summary = if interactive {
        let mut observer = ProgressObserver::new(std::io::stdout());
        let summary = run_suite(&config, &args.project.exec_args, &mut observer)?;
        observer
            .finish()
            .context("failed to clear the progress line")?;
        summary
    } else {
        run_suite(&config, &args.project.exec_args, &mut NoopObserver)?
    };

    for result in summary.results() {
        if let Some(text) = render_failure(result, palette) {
            println!("{text}");
        }
    }
    println!("{}", render_summary_line(&summary, palette));

    if let Some(report_path) = &args.report {
        let report_path = resolve_path(&working_dir, report_path);
        write_report(&report_path, &build_report(&config, &summary))?;
        println!("JSON report: {}", report_path.display());
    }

    show_extras(&summary, args.extras)?;

    if summary.passed() { Ok(0) } else { Ok(1) }
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let config = args.project.to_config(&working_dir);
    compile_subject(&args.compiler.to_build_config(&config))?;
    Ok(0)
}

pub(super) fn run_list_command(args: ListArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let config = args.project.to_config(&working_dir);
    let fixtures = load_fixtures(&config.input_dir, &config.output_dir, &config.extension)?;

    for fixture in &fixtures {
        let marker = if fixture.expected_path.is_file() {
            ""
        } else {
            " (missing expected)"
        };
        println!(
            "{}: {} -> {}{}",
            fixture,
            fixture.input_path.display(),
            fixture.expected_path.display(),
            marker
        );
    }
    println!("{} fixture(s)", fixtures.len());
    Ok(0)
}

fn compile_subject(build: &BuildConfig) -> Result<(), CliError> {
    if cfg!(windows) {
        println!(
            "Skipping build on Windows: using existing {}",
            build.output.display()
        );
    } else {
        println!("Compiling:");
    }

    match build_subject(build)? {
        BuildOutcome::Compiled {
            compiler_output, ..
        } => {
            if !compiler_output.trim().is_empty() {
                print!("{compiler_output}");
            }
            println!("  Build success.");
        }
        BuildOutcome::Prebuilt => {}
    }
    Ok(())
}

fn show_extras(summary: &RunSummary, mode: ExtrasMode) -> Result<(), CliError> {
    let show = match mode {
        ExtrasMode::Never => false,
        ExtrasMode::Always => true,
        ExtrasMode::Prompt => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            confirm(EXTRAS_PROMPT, &mut stdin.lock(), &mut stdout.lock())
                .context("failed to read the extra-info answer")?
        }
    };
    if show {
        println!("{}", render_extras(summary));
    }
    Ok(())
}
