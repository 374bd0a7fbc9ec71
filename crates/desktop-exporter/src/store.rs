// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process trace storage.
//!
//! Spans are grouped by `TraceID` as they arrive. Each trace keeps its spans in
//! arrival order together with a cached [`TraceSummary`] that is recomputed for
//! every trace touched by an ingest, before the ingest releases the store lock.
//!
//! # Locking
//!
//! A single store-wide [`RwLock`] guards all state. Ingest, clear and close
//! take it exclusively, lookups share it. Readers therefore see every trace
//! either before or after an ingest, never in between. There is no second lock,
//! so there is no acquisition order to get wrong.
//!
//! # Lifecycle
//!
//! [`TraceStore::close`] must be called once, after the HTTP server has stopped
//! handing out requests. Every later call, including a second `close`, returns
//! [`StoreError::Closed`].

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::summary::summarize;
use crate::telemetry::{SpanData, TraceData, TraceSummaries, TraceSummary};

#[async_trait]
pub trait TraceStore {
    /// Merges spans into their traces, creating traces as needed.
    ///
    /// The batch is validated as a whole before anything is written. If
    /// `cancel` fires part way through, the spans appended so far stay in the
    /// store and `StoreError::Cancelled` is returned.
    async fn add_spans(
        &self,
        cancel: &CancellationToken,
        spans: Vec<SpanData>,
    ) -> Result<(), StoreError>;

    /// Summaries of every trace currently held, newest trace first.
    async fn get_trace_summaries(&self) -> Result<TraceSummaries, StoreError>;

    async fn get_trace(&self, trace_id: &str) -> Result<TraceData, StoreError>;

    async fn clear_traces(&self) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

struct TraceEntry {
    spans: Vec<SpanData>,
    summary: TraceSummary,
}

#[derive(Default)]
struct StoreState {
    closed: bool,
    traces: HashMap<String, TraceEntry>,
    /// Trace ids by first arrival, oldest at the front.
    arrival_order: VecDeque<String>,
}

impl StoreState {
    fn insert_span(&mut self, span: SpanData, max_traces: Option<usize>) {
        if let Some(entry) = self.traces.get_mut(&span.trace_id) {
            entry.spans.push(span);
            return;
        }

        let trace_id = span.trace_id.clone();
        self.traces.insert(
            trace_id.clone(),
            TraceEntry {
                spans: vec![span],
                summary: TraceSummary::default(),
            },
        );
        self.arrival_order.push_back(trace_id);

        if let Some(max_traces) = max_traces {
            while self.arrival_order.len() > max_traces {
                if let Some(oldest) = self.arrival_order.pop_front() {
                    self.traces.remove(&oldest);
                    warn!("Trace store is full, evicting oldest trace {oldest}");
                }
            }
        }
    }

    fn refresh_summary(&mut self, trace_id: &str) {
        // the trace may have been evicted later in the same batch
        if let Some(entry) = self.traces.get_mut(trace_id) {
            entry.summary = summarize(trace_id, &entry.spans);
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn validate_spans(spans: &[SpanData]) -> Result<(), StoreError> {
    for (index, span) in spans.iter().enumerate() {
        if span.trace_id.is_empty() {
            return Err(StoreError::Validation(format!(
                "span {index} has an empty TraceID"
            )));
        }
        if span.span_id.is_empty() {
            return Err(StoreError::Validation(format!(
                "span {index} of trace {} has an empty SpanID",
                span.trace_id
            )));
        }
    }
    Ok(())
}

/// Trace store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    max_traces: Option<usize>,
}

impl MemoryStore {
    /// Creates a store without a trace limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that holds at most `max_traces` traces, evicting the
    /// oldest trace when a new one arrives at the limit.
    pub fn with_capacity(max_traces: usize) -> Self {
        MemoryStore {
            state: RwLock::new(StoreState::default()),
            max_traces: Some(max_traces.max(1)),
        }
    }
}

#[async_trait]
impl TraceStore for MemoryStore {
    async fn add_spans(
        &self,
        cancel: &CancellationToken,
        spans: Vec<SpanData>,
    ) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            state = self.state.write() => state,
        };
        state.ensure_open()?;
        validate_spans(&spans)?;

        let span_count = spans.len();
        let mut applied = 0;
        let mut touched = HashSet::new();
        let mut result = Ok(());
        for span in spans {
            if cancel.is_cancelled() {
                result = Err(StoreError::Cancelled);
                break;
            }
            touched.insert(span.trace_id.clone());
            state.insert_span(span, self.max_traces);
            applied += 1;
        }

        for trace_id in &touched {
            state.refresh_summary(trace_id);
        }

        if result.is_err() {
            warn!("Span ingestion cancelled after {applied} of {span_count} spans");
        } else {
            debug!("Added {span_count} spans to {} traces", touched.len());
        }
        result
    }

    async fn get_trace_summaries(&self) -> Result<TraceSummaries, StoreError> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let trace_summaries = state
            .arrival_order
            .iter()
            .rev()
            .filter_map(|trace_id| state.traces.get(trace_id))
            .map(|entry| entry.summary.clone())
            .collect();
        Ok(TraceSummaries { trace_summaries })
    }

    async fn get_trace(&self, trace_id: &str) -> Result<TraceData, StoreError> {
        let state = self.state.read().await;
        state.ensure_open()?;

        state
            .traces
            .get(trace_id)
            .map(|entry| TraceData {
                trace_id: trace_id.to_string(),
                spans: entry.spans.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(trace_id.to_string()))
    }

    async fn clear_traces(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        let trace_count = state.traces.len();
        state.traces.clear();
        state.arrival_order.clear();
        info!("Cleared {trace_count} traces from the trace store");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        state.closed = true;
        state.traces = HashMap::new();
        state.arrival_order = VecDeque::new();
        info!("Trace store closed");
        Ok(())
    }
}
