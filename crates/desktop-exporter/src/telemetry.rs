// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span and trace records as they are held by the store and served over the API.
//!
//! Field names on the wire follow the exporter's established JSON shape
//! (`TraceID`, `SpanID`, `ParentSpanID`, ...), so every struct renames its
//! fields explicitly rather than relying on Rust naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource attribute key holding the name of the emitting service.
pub const SERVICE_NAME_ATTRIBUTE_KEY: &str = "service.name";

pub type Attributes = BTreeMap<String, AttributeValue>;

/// A dynamically typed attribute value.
///
/// Serialized untagged, so `"service.name": "checkout"` and `"retries": 3`
/// appear on the wire as plain JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    Empty,
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceData {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub dropped_attributes_count: u32,
}

impl ResourceData {
    pub fn service_name(&self) -> Option<&str> {
        self.attributes
            .get(SERVICE_NAME_ATTRIBUTE_KEY)
            .and_then(AttributeValue::as_str)
    }
}

/// The instrumentation library that produced a span.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScopeData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventData {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkData {
    #[serde(rename = "TraceID")]
    pub trace_id: String,
    #[serde(rename = "SpanID")]
    pub span_id: String,
    #[serde(default)]
    pub trace_state: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub dropped_attributes_count: u32,
}

/// A single observed span. Never mutated once it has been ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpanData {
    #[serde(rename = "TraceID")]
    pub trace_id: String,
    #[serde(default)]
    pub trace_state: String,
    #[serde(rename = "SpanID")]
    pub span_id: String,
    /// Empty for a root span.
    #[serde(rename = "ParentSpanID", default)]
    pub parent_span_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub events: Vec<EventData>,
    #[serde(default)]
    pub links: Vec<LinkData>,
    #[serde(default)]
    pub resource: Option<ResourceData>,
    #[serde(default)]
    pub scope: Option<ScopeData>,
    #[serde(default)]
    pub dropped_attributes_count: u32,
    #[serde(default)]
    pub dropped_events_count: u32,
    #[serde(default)]
    pub dropped_links_count: u32,
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub status_message: String,
}

impl SpanData {
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.resource.as_ref().and_then(ResourceData::service_name)
    }
}

/// Every span held for one trace, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceData {
    #[serde(rename = "TraceID")]
    pub trace_id: String,
    pub spans: Vec<SpanData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceSummary {
    pub has_root_span: bool,
    pub root_service_name: String,
    pub root_name: String,
    /// `None` until the root span has arrived.
    pub root_start_time: Option<DateTime<Utc>>,
    pub root_end_time: Option<DateTime<Utc>>,
    pub span_count: u32,
    #[serde(rename = "TraceID")]
    pub trace_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceSummaries {
    pub trace_summaries: Vec<TraceSummary>,
}
