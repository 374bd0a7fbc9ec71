// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::telemetry::{SpanData, TraceSummary};

/// Builds the summary of one trace from its spans, given in arrival order.
///
/// The root is the first span without a parent. Later parentless spans are
/// ordinary members of the trace and only count towards `span_count`. When no
/// root has arrived yet the root fields stay empty.
pub fn summarize(trace_id: &str, spans: &[SpanData]) -> TraceSummary {
    let span_count = u32::try_from(spans.len()).unwrap_or(u32::MAX);

    match spans.iter().find(|span| span.is_root()) {
        Some(root) => TraceSummary {
            has_root_span: true,
            root_service_name: root.service_name().unwrap_or_default().to_string(),
            root_name: root.name.clone(),
            root_start_time: Some(root.start_time),
            root_end_time: Some(root.end_time),
            span_count,
            trace_id: trace_id.to_string(),
        },
        None => TraceSummary {
            span_count,
            trace_id: trace_id.to_string(),
            ..Default::default()
        },
    }
}
