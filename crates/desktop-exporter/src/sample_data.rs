// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::telemetry::SpanData;

const SAMPLE_SPANS_JSON: &str = include_str!("../fixtures/sample_spans.json");

/// Decodes the bundled demo spans: one complete three-span checkout trace and
/// one trace whose root span never arrived.
pub fn sample_spans() -> Result<Vec<SpanData>, serde_json::Error> {
    serde_json::from_str(SAMPLE_SPANS_JSON)
}
