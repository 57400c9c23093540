//! Dispatches a parsed command and prints its output to stdout

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::connector::{Connector, ReadOptions, SegmentConnector};
use crate::error::Result;
use crate::streams;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

pub struct Runner {
    cli: Cli,
}

impl Runner {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Spec => self.emit(&json!({
                "type": "SPEC",
                "spec": SegmentConnector::describe(),
            })),
            Commands::Streams => {
                let names: Vec<&str> = streams::registry().iter().map(|s| s.name).collect();
                self.emit(&json!({"type": "STREAMS", "streams": names}))
            }
            Commands::Discover => {
                let catalog = self.connector()?.discover().await?;
                self.emit(&catalog)
            }
            Commands::Check => {
                let connector = self.connector()?;
                info!(base_url = %connector.config().base_url, "checking connection");
                let status = connector.check().await?;
                self.emit(&json!({"type": "CONNECTION_STATUS", "connectionStatus": status}))
            }
            Commands::Read {
                streams,
                state_per_page,
            } => {
                self.read(ReadOptions {
                    streams: streams.clone(),
                    emit_state_per_page: *state_per_page,
                })
                .await
            }
        }
    }

    fn connector(&self) -> Result<SegmentConnector> {
        let config = self.cli.sources.config()?;
        debug!(?config, "loaded config");
        Ok(SegmentConnector::new(config)?.with_state(self.cli.sources.state()?))
    }

    /// Messages are printed as the engine yields them, so a failing stream
    /// still leaves every earlier STATE on stdout
    async fn read(&self, options: ReadOptions) -> Result<()> {
        let mut messages = self.connector()?.read(options).await?;

        let mut records = 0usize;
        while let Some(message) = messages.try_next().await? {
            records += usize::from(message.is_record());
            self.emit(&message)?;
        }

        info!(records, "read complete");
        Ok(())
    }

    fn emit(&self, message: &impl Serialize) -> Result<()> {
        let line = render(message, self.cli.format)?;
        println!("{line}");
        Ok(())
    }
}

fn render(message: &impl Serialize, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(message)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(message)?,
    })
}
