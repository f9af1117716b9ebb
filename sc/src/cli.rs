//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Subcurator - conversation-driven subreddit planner
#[derive(Parser, Debug)]
#[command(
    name = "sc",
    author,
    version,
    about = "Plan subreddit subscription changes one conversation turn at a time",
    long_about = None
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

    #[command(subcommand)]
    pub command: Command,
}

/// Files holding the user's activity name sets, one name per line
#[derive(Args, Debug, Clone, Default)]
pub struct ActivityArgs {
    /// Subscribed subreddits
    #[arg(long, value_name = "FILE")]
    pub subscribed: Option<PathBuf>,

    /// Recently upvoted-in subreddits
    #[arg(long, value_name = "FILE")]
    pub upvoted: Option<PathBuf>,

    /// Recently commented-in subreddits
    #[arg(long, value_name = "FILE")]
    pub commented: Option<PathBuf>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score subreddits by activity and list the active ones
    Score {
        #[command(flatten)]
        activity: ActivityArgs,

        /// Minimum score (1-3); defaults to the configured threshold
        #[arg(short, long)]
        threshold: Option<u8>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify an utterance into intent flags
    Classify {
        /// Also report whether this is an exclusion-only request
        #[arg(short, long)]
        exclusion: bool,

        /// What the user said
        #[arg(required = true, trailing_var_arg = true)]
        utterance: Vec<String>,
    },

    /// Parse a model reply into a plan (reads stdin when FILE is absent)
    Parse {
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Reconcile a model reply against the previous plan
    Reconcile {
        /// Model reply to parse
        #[arg(short, long, value_name = "FILE")]
        reply: PathBuf,

        /// Previous plan as JSON
        #[arg(short, long, value_name = "FILE")]
        previous: Option<PathBuf>,

        /// Subscribed subreddits, one per line
        #[arg(long, value_name = "FILE")]
        subscribed: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// What the user said this turn
        #[arg(trailing_var_arg = true)]
        utterance: Vec<String>,
    },

    /// Merge two plans
    Merge {
        /// First plan as JSON
        a: PathBuf,

        /// Second plan as JSON
        b: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the prompt the next turn would send to the model
    Prompt {
        /// State file; defaults to the configured one
        #[arg(short, long, value_name = "FILE")]
        state: Option<PathBuf>,

        #[command(flatten)]
        activity: ActivityArgs,

        /// What the user said
        #[arg(required = true, trailing_var_arg = true)]
        utterance: Vec<String>,
    },

    /// Run one conversation turn and save the resulting state
    Turn {
        /// State file; defaults to the configured one
        #[arg(short, long, value_name = "FILE")]
        state: Option<PathBuf>,

        /// Canned model reply used if the turn reaches the model
        #[arg(short, long, value_name = "FILE")]
        reply: Option<PathBuf>,

        #[command(flatten)]
        activity: ActivityArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// What the user said; empty confirms the current plan
        #[arg(trailing_var_arg = true)]
        utterance: Vec<String>,
    },

    /// Show the current plan
    Show {
        /// State file; defaults to the configured one
        #[arg(short, long, value_name = "FILE")]
        state: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Forget the conversation
    Reset {
        /// State file; defaults to the configured one
        #[arg(short, long, value_name = "FILE")]
        state: Option<PathBuf>,
    },
}

/// Output format for plan-producing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

/// Join trailing words back into one utterance
pub fn utterance_text(words: &[String]) -> String {
    words.join(" ")
}
