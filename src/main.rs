use clap::Parser;
use std::process::ExitCode;
use tvly::cli::{Cli, CliError};

/// Main entry point
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match tvly::cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            if verbose {
                if let CliError::Other(inner) = &err {
                    eprintln!("{inner:?}");
                }
            }
            ExitCode::from(err.exit_code())
        }
    }
}
