use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "liftlens", about = "Workout Log Analytics & Weekly Dashboard Service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the config, database and default muscle rules
    Init,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status {
        #[arg(long)]
        user: Option<String>,
    },
    Doctor,
    /// Load an exercise catalog and session history export
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print this week's dashboard
    Dashboard {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Sessions {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete logged sets, optionally limited to recent days and specific exercises
    ClearHistory {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long = "exercise")]
        exercises: Vec<String>,
    },
    /// Run the HTTP API
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
