//! Stackplan CLI.

use clap::Parser;
use stackplan::cli::Cli;
use tracing::Level;

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    stackplan::telemetry::init_tracing(cli.log_json, level);

    if let Err(e) = stackplan::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
