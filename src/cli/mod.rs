//! CLI Module
//!
//! Command-line interface for exercising the session core against the mock
//! engine.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tapelab - multi-track recording session core
#[derive(Parser, Debug)]
#[command(name = "tapelab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a demo session and print its playback schedule
    #[command(name = "schedule")]
    Schedule {
        /// Print instructions as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a scripted record start/stop pass against the mock engine
    #[command(name = "record-demo")]
    RecordDemo {
        /// Seconds of audio the mock engine reports as captured
        #[arg(long, default_value_t = 4.0)]
        duration: f64,

        /// Session tempo driving the count-in length
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
    },

    /// Print the default session state
    #[command(name = "print-session")]
    PrintSession,
}
