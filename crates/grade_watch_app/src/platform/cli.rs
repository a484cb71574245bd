use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::logging::LogDestination;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "grade-watch",
    version,
    about = "Watches grading jobs and announces each completion once per session"
)]
pub struct Cli {
    /// RON config file; missing file means defaults
    #[arg(long, global = true, default_value = "grade_watch.ron")]
    pub config: PathBuf,

    /// Backend base URL (trailing slashes are ignored)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Session name; completion markers are kept per session
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Directory holding the session marker files
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, global = true, value_enum)]
    pub log: Option<LogDestination>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Poll every real job in the jobs file until it completes
    Watch {
        /// JSON object mapping job ids to {name, submitted_at, is_mock}
        #[arg(long)]
        jobs: PathBuf,

        /// Delay between status checks of one job
        #[arg(long)]
        interval: Option<humantime::Duration>,

        /// Give up on a job after polling it this long
        #[arg(long)]
        max_age: Option<humantime::Duration>,

        /// Wait for Enter after each completion notice (default: when stdin is a terminal)
        #[arg(long, conflicts_with = "no_acknowledge")]
        acknowledge: bool,

        /// Print completion notices without waiting
        #[arg(long)]
        no_acknowledge: bool,
    },
    /// Print the job selection list, newest first
    List {
        #[arg(long)]
        jobs: PathBuf,

        /// Assignment name of the pre-loaded demo dataset to list first
        #[arg(long)]
        demo: Option<String>,
    },
    /// Forget which jobs were already announced in this session
    Reset,
}
