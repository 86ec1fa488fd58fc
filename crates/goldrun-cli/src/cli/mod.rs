mod commands;
mod helpers;
mod render;

use clap::Parser;
use goldrun_core::domain::HarnessError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let harness_error = error.as_harness_error();
            eprintln!("{}", harness_error.diagnostic_line());
            eprintln!("{}", harness_error.fatal_exit_line());
            harness_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` wins over `-v`; without either only warnings are shown.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "goldrun",
    version,
    about = "Build a C++ subject and check its output against golden files"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Build the subject, run every fixture and report differences
    Run(commands::RunArgs),
    /// Compile the subject without running fixtures
    Build(commands::BuildArgs),
    /// List the fixtures that would be run
    List(commands::ListArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_run_command(args),
        CliCommand::Build(args) => commands::run_build_command(args),
        CliCommand::List(args) => commands::run_list_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Harness(HarnessError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<HarnessError> for CliError {
    fn from(error: HarnessError) -> Self {
        Self::Harness(error)
    }
}

impl CliError {
    fn as_harness_error(&self) -> HarnessError {
        match self {
            Self::Usage(message) => {
                HarnessError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Harness(error) => error.clone(),
            Self::Internal(error) => HarnessError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
