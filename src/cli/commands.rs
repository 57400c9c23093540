//! Argument parsing for the `tap-segment` binary

use crate::config::TapConfig;
use crate::error::{Error, Result, ResultExt};
use crate::state::StateManager;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Extract Segment usage and event volumes as Singer messages
#[derive(Parser, Debug)]
#[command(name = "tap-segment", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub sources: Sources,

    /// How each output message is rendered
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where config and bookmarks come from. Inline JSON beats a file.
#[derive(Args, Debug, Default)]
pub struct Sources {
    /// Config file, JSON or YAML
    #[arg(short = 'C', long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// Bookmark file; updated in place as streams finish
    #[arg(short = 's', long = "state", global = true)]
    pub state_file: Option<PathBuf>,

    #[arg(long, global = true)]
    pub state_json: Option<String>,
}

impl Sources {
    /// Without any config the token is what is missing
    pub fn config(&self) -> Result<TapConfig> {
        match (&self.config_json, &self.config_file) {
            (Some(json), _) => TapConfig::from_json(json).context("--config-json"),
            (None, Some(path)) => TapConfig::from_file(path),
            (None, None) => Err(Error::missing_field("api_token")),
        }
    }

    /// Empty in-memory bookmarks when nothing was given
    pub fn state(&self) -> Result<StateManager> {
        match (&self.state_json, &self.state_file) {
            (Some(json), _) => StateManager::from_json(json).context("--state-json"),
            (None, Some(path)) => StateManager::from_file(path)
                .with_context(|| format!("state file {}", path.display())),
            (None, None) => Ok(StateManager::in_memory()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the config schema
    Spec,
    /// Verify the API token with one request
    Check,
    /// Print the Singer catalog
    Discover,
    /// Print stream names only
    Streams,
    /// Sync streams to stdout
    Read {
        /// Comma-separated stream names; all streams when omitted
        #[arg(long)]
        streams: Option<String>,

        /// Checkpoint after every page instead of once per stream
        #[arg(long)]
        state_per_page: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One compact message per line
    Json,
    /// Indented, for reading by eye
    Pretty,
}
