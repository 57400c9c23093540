//! Turns stream definitions into Singer messages
//!
//! `SyncEngine` resumes each stream from its bookmark and hands it to a
//! `StreamSync`, which fetches one page per step. Streams run one after
//! another and pages one after another; nothing is spawned.

mod driver;
mod types;

pub use driver::StreamSync;
pub use types::{Message, MessageStream, SyncConfig, SyncStats};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::source::RequestContext;
use crate::state::StateManager;
use crate::streams::StreamDefinition;
use crate::types::{Clock, SystemClock};
use futures::stream::{self, TryStreamExt};
use std::sync::Arc;

/// Shared client, bookmarks and clock for every stream of a run
pub struct SyncEngine {
    client: Arc<HttpClient>,
    state: StateManager,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    /// Summed over streams collected with `sync_stream`
    stats: SyncStats,
}

impl SyncEngine {
    pub fn new(client: HttpClient, state: StateManager) -> Self {
        Self {
            client: Arc::new(client),
            state,
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Prepare a stream's driver, resuming from its stored checkpoint
    pub async fn open_stream(&self, definition: &StreamDefinition) -> Result<StreamSync> {
        let checkpoint = self.state.checkpoint_for(definition.name).await?;
        let context = RequestContext::new(self.config.start_date, self.config.page_size)
            .with_checkpoint(checkpoint);

        Ok(StreamSync::new(
            Arc::clone(&self.client),
            self.state.clone(),
            Arc::clone(&self.clock),
            definition.instantiate(self.config.lookback),
            context,
            self.config.emit_state_per_page,
        ))
    }

    /// Pages are fetched only as the returned stream is polled
    pub async fn read_stream(&self, definition: &StreamDefinition) -> Result<MessageStream> {
        let sync = self.open_stream(definition).await?;

        let batches = stream::try_unfold(sync, |mut sync| async move {
            let next = sync.next_batch().await?;
            Ok::<_, Error>(next.map(|batch| {
                let messages = stream::iter(batch.into_iter().map(Ok::<Message, Error>));
                (messages, sync)
            }))
        });

        Ok(Box::pin(batches.try_flatten()))
    }

    /// Run a stream to the end and collect its messages. Counters are
    /// merged into `stats` whether or not it fails.
    pub async fn sync_stream(&mut self, definition: &StreamDefinition) -> Result<Vec<Message>> {
        let mut sync = self.open_stream(definition).await?;
        let mut messages = Vec::new();

        let outcome = loop {
            match sync.next_batch().await {
                Ok(Some(batch)) => messages.extend(batch),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.stats.merge(sync.stats());
        outcome.map(|()| messages)
    }

    /// Issue the first request of a stream and report how many records it
    /// returned
    pub async fn sample_page(&self, definition: &StreamDefinition) -> Result<usize> {
        self.open_stream(definition).await?.sample_page().await
    }
}
