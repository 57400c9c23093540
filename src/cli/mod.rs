//! The `tap-segment` command line: `spec`, `check`, `discover`, `streams`
//! and `read`. Output goes to stdout one message per line.

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, Sources};
pub use runner::Runner;
