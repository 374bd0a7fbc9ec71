// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock trace stores for testing the HTTP layer

use desktop_exporter::error::StoreError;
use desktop_exporter::store::TraceStore;
use desktop_exporter::telemetry::{SpanData, TraceData, TraceSummaries};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Mock store that behaves as if it had already been closed
pub struct ClosedStore;

#[async_trait::async_trait]
impl TraceStore for ClosedStore {
    async fn add_spans(
        &self,
        _cancel: &CancellationToken,
        _spans: Vec<SpanData>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Closed)
    }

    async fn get_trace_summaries(&self) -> Result<TraceSummaries, StoreError> {
        Err(StoreError::Closed)
    }

    async fn get_trace(&self, _trace_id: &str) -> Result<TraceData, StoreError> {
        Err(StoreError::Closed)
    }

    async fn clear_traces(&self) -> Result<(), StoreError> {
        Err(StoreError::Closed)
    }

    async fn close(&self) -> Result<(), StoreError> {
        Err(StoreError::Closed)
    }
}

/// Mock store that records every ingested batch and serves nothing back
#[derive(Default)]
pub struct RecordingStore {
    pub batches: Mutex<Vec<Vec<SpanData>>>,
}

#[async_trait::async_trait]
impl TraceStore for RecordingStore {
    async fn add_spans(
        &self,
        _cancel: &CancellationToken,
        spans: Vec<SpanData>,
    ) -> Result<(), StoreError> {
        self.batches.lock().unwrap().push(spans);
        Ok(())
    }

    async fn get_trace_summaries(&self) -> Result<TraceSummaries, StoreError> {
        Ok(TraceSummaries::default())
    }

    async fn get_trace(&self, trace_id: &str) -> Result<TraceData, StoreError> {
        Err(StoreError::NotFound(trace_id.to_string()))
    }

    async fn clear_traces(&self) -> Result<(), StoreError> {
        self.batches.lock().unwrap().clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
