//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinkeep - keeps a stable handle on actors in a live game process
#[derive(Parser)]
#[command(
    name = "pk",
    about = "Track pinned actors across address churn and photo-mode transitions",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scripted session against a simulated process and print pin events
    Simulate {
        /// Delay between scripted steps in milliseconds
        #[arg(short, long, default_value_t = 300)]
        step_ms: u64,

        /// Record pin events to the history directory
        #[arg(short, long)]
        record: bool,

        /// Print a JSON summary of every pin at the end
        #[arg(short, long)]
        json: bool,
    },

    /// Print the initials derived for an actor name
    Initials {
        /// Actor name
        name: String,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Print recorded events for a pin
    History {
        /// Pin id (or `_global`)
        pin: String,

        /// History directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

/// Log file location: `<data_local_dir>/pinkeep/logs/pinkeep.log`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pinkeep")
        .join("logs")
        .join("pinkeep.log")
}
