//! Per-stream page driver

use super::types::{Message, SyncStats};
use crate::decode::RecordExtractor;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pagination::{PageResponse, PageToken, PaginationState};
use crate::schema::{conform, parse_timestamp};
use crate::source::RequestContext;
use crate::state::StateManager;
use crate::streams::SegmentStream;
use crate::types::Clock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Schema,
    Paging,
    Finish,
    Done,
}

/// Drives one stream's pagination sequence, one page per call.
///
/// Yields the SCHEMA message first, then one batch of RECORD messages per
/// page, then a final STATE message once the strategy reports no further
/// page.
pub struct StreamSync {
    client: Arc<HttpClient>,
    state: StateManager,
    clock: Arc<dyn Clock>,
    stream: SegmentStream,
    context: RequestContext,
    extractor: RecordExtractor,
    pagination: PaginationState,
    seen_cursors: HashSet<String>,
    emit_state_per_page: bool,
    phase: Phase,
    stats: SyncStats,
    started: Instant,
}

impl StreamSync {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        state: StateManager,
        clock: Arc<dyn Clock>,
        stream: SegmentStream,
        context: RequestContext,
        emit_state_per_page: bool,
    ) -> Self {
        let extractor = RecordExtractor::new(stream.definition.records_locator);
        Self {
            client,
            state,
            clock,
            stream,
            context,
            extractor,
            pagination: PaginationState::new(),
            seen_cursors: HashSet::new(),
            emit_state_per_page,
            phase: Phase::Schema,
            stats: SyncStats::default(),
            started: Instant::now(),
        }
    }

    /// Stream name
    pub fn name(&self) -> &'static str {
        self.stream.name()
    }

    /// Counters for this stream so far
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Current pagination state
    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    /// Next batch of messages, or `None` when the stream is exhausted
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Message>>> {
        match self.phase {
            Phase::Schema => {
                self.phase = Phase::Paging;
                info!(
                    stream = self.name(),
                    start = %self.context.starting_timestamp(),
                    "starting stream"
                );
                Ok(Some(vec![self.schema_message()]))
            }
            Phase::Paging => {
                if self.pagination.done {
                    self.phase = Phase::Finish;
                    return Ok(Some(Vec::new()));
                }
                let result = self.fetch_page().await;
                if result.is_err() {
                    self.stats.failed();
                    self.phase = Phase::Done;
                }
                result.map(Some)
            }
            Phase::Finish => {
                self.phase = Phase::Done;
                self.stats.finished(self.started.elapsed());
                info!(
                    stream = self.name(),
                    records = self.stats.records_synced,
                    pages = self.stats.pages_fetched,
                    "completed stream"
                );
                Ok(Some(vec![self.commit_state().await?]))
            }
            Phase::Done => Ok(None),
        }
    }

    /// Fetch a single page and return its record count without emitting
    /// anything or touching state.
    pub async fn sample_page(&mut self) -> Result<usize> {
        let (body, _) = self.request_page().await?;
        Ok(self.extractor.records(&body)?.len())
    }

    fn schema_message(&self) -> Message {
        let def = &self.stream.definition;
        Message::Schema {
            stream: def.name.to_string(),
            schema: def.schema.to_json_schema(),
            key_properties: def.primary_keys.iter().map(ToString::to_string).collect(),
            bookmark_properties: vec![def.replication_key.to_string()],
        }
    }

    async fn request_page(&mut self) -> Result<(Value, reqwest::header::HeaderMap)> {
        let today = self.clock.today();
        let request = self
            .stream
            .strategy
            .build_params(&self.context, &self.pagination, today);

        debug!(
            stream = self.name(),
            page = self.pagination.pages + 1,
            params = ?request.params,
            "requesting page"
        );

        let response = self
            .client
            .get(self.stream.definition.path, &request.params)
            .await?;
        self.pagination.record_request(request.period);

        let body = self.extractor.parse(&response.body)?;
        Ok((body, response.headers))
    }

    async fn fetch_page(&mut self) -> Result<Vec<Message>> {
        let (body, headers) = self.request_page().await?;

        let def = &self.stream.definition;
        let raw_records = self.extractor.records(&body)?;
        let extracted_at = self.clock.now();
        let mut messages = Vec::with_capacity(raw_records.len() + 1);

        for raw in raw_records {
            let record = self.stream.strategy.post_process(def.name, raw)?;
            let record = conform(def.name, &def.schema, def.replication_key, record)?;

            let replication_value = record
                .get(def.replication_key)
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
                .ok_or_else(|| Error::MissingReplicationKey {
                    stream: def.name.to_string(),
                    key: def.replication_key.to_string(),
                })?;
            self.state
                .advance(def.name, def.replication_key, replication_value)
                .await;

            messages.push(Message::record(def.name, record, extracted_at));
        }

        let count = messages.len();
        self.stats.page(count);

        let today = self.clock.today();
        let next = self.stream.strategy.next_token(
            &PageResponse::new(&body, &headers),
            &self.pagination,
            today,
        );

        match &next {
            Some(PageToken::Opaque(cursor)) => {
                if !self.seen_cursors.insert(cursor.clone()) {
                    return Err(Error::PaginationLoop {
                        stream: def.name.to_string(),
                        token: cursor.clone(),
                    });
                }
            }
            // Cursors are only unique within one monthly window
            Some(PageToken::Month(_)) => self.seen_cursors.clear(),
            None => {}
        }

        debug!(
            stream = def.name,
            page = self.pagination.pages,
            records = count,
            next = ?next.as_ref().map(ToString::to_string),
            "fetched page"
        );
        self.pagination.advance(next);

        if self.emit_state_per_page {
            messages.push(self.commit_state().await?);
        }

        Ok(messages)
    }

    async fn commit_state(&self) -> Result<Message> {
        let written = self.state.persist().await?;
        Ok(Message::state(serde_json::to_value(written)?))
    }
}
