mod commands;
mod logging;

use clap::Parser;
use gapfarm_core::domain::FarmError;

pub fn run_from_env() -> i32 {
    let args = std::iter::once("gapfarm".to_string())
        .chain(std::env::args().skip(1))
        .collect::<Vec<_>>();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let farm_error = error.as_farm_error();
            eprintln!("{}", farm_error.diagnostic_line());
            if let Some(summary_line) = farm_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            farm_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "gapfarm",
    version,
    about = "Initialize and run the GAP many-body perturbation test farm"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Initialize or run the selected test cases
    Run(commands::RunArgs),
    /// Show or patch tunable parameters of a gw.inp control file
    Gwinp(commands::GwinpArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_farm_command(args),
        CliCommand::Gwinp(args) => commands::run_gwinp_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(FarmError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_farm_error(&self) -> FarmError {
        match self {
            Self::Usage(message) => FarmError::config("CONFIG.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => FarmError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<FarmError> for CliError {
    fn from(error: FarmError) -> Self {
        Self::Compute(error)
    }
}
