//! Tapelab CLI - Session Core Demo
//!
//! Command-line harness for the Tapelab session core.

use clap::Parser;
use env_logger::Env;
use log::info;

use tapelab::cli::{commands, Cli, Commands};
use tapelab::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Tapelab session core v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Schedule { json }) => commands::schedule(json),
        Some(Commands::RecordDemo { duration, bpm }) => commands::record_demo(duration, bpm).await,
        Some(Commands::PrintSession) => commands::print_session(),
        None => {
            println!("Tapelab session core v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}
