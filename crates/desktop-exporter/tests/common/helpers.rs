// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use chrono::{Duration as ChronoDuration, Utc};
use desktop_exporter::config::Config;
use desktop_exporter::server::DesktopServer;
use desktop_exporter::store::TraceStore;
use desktop_exporter::telemetry::{
    Attributes, ResourceData, ScopeData, SpanData, SERVICE_NAME_ATTRIBUTE_KEY,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A server bound to a random local port, stopped by `teardown`.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<dyn TraceStore + Send + Sync>,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
}

impl TestServer {
    pub async fn start(store: Arc<dyn TraceStore + Send + Sync>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let server = DesktopServer {
            config: Arc::new(Config::default()),
            store: store.clone(),
        };
        let shutdown = CancellationToken::new();
        let server_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move { server.serve(listener, server_shutdown).await });

        TestServer {
            addr,
            store,
            shutdown,
            handle,
        }
    }

    /// Stops the server, then closes the store.
    pub async fn teardown(self) {
        self.shutdown.cancel();
        timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("Server did not shut down")
            .expect("Server task failed")
            .expect("Server returned an error");
        // a mock store may already refuse to close
        let _ = self.store.close().await;
    }
}

/// Send an HTTP request over TCP and return the status and collected body
pub async fn send_tcp_request(
    addr: SocketAddr,
    uri: &str,
    method: &str,
    body: Option<Vec<u8>>,
) -> Result<(StatusCode, Bytes), Box<dyn std::error::Error + Send + Sync>> {
    let stream = timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(addr)).await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Host", addr.to_string())
        .header("Content-Type", "application/json");

    let body_data = body.unwrap_or_default();
    request_builder = request_builder.header("Content-Length", body_data.len().to_string());
    let request = request_builder.body(Full::new(Bytes::from(body_data)))?;

    let response = timeout(Duration::from_secs(2), sender.send_request(request)).await??;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok((status, bytes))
}

pub async fn get(
    addr: SocketAddr,
    uri: &str,
) -> Result<(StatusCode, Bytes), Box<dyn std::error::Error + Send + Sync>> {
    send_tcp_request(addr, uri, "GET", None).await
}

/// Same span the exporter's own handler tests have always used
pub fn create_test_span() -> SpanData {
    let now = Utc::now();
    SpanData {
        trace_id: "1234567890".to_string(),
        trace_state: String::new(),
        span_id: "12345".to_string(),
        parent_span_id: String::new(),
        name: "test".to_string(),
        kind: String::new(),
        start_time: now,
        end_time: now + ChronoDuration::seconds(1),
        attributes: Attributes::new(),
        events: vec![],
        links: vec![],
        resource: Some(ResourceData {
            attributes: Attributes::from([(
                SERVICE_NAME_ATTRIBUTE_KEY.to_string(),
                "pumpkin.pie".into(),
            )]),
            dropped_attributes_count: 0,
        }),
        scope: Some(ScopeData {
            name: "test.scope".to_string(),
            version: "1".to_string(),
            attributes: Attributes::new(),
            dropped_attributes_count: 0,
        }),
        dropped_attributes_count: 0,
        dropped_events_count: 0,
        dropped_links_count: 0,
        status_code: String::new(),
        status_message: String::new(),
    }
}
