// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::http_utils::{
    create_json_http_response, create_store_error_http_response, log_and_create_http_response,
    verify_request_content_length, HttpResponse,
};
use crate::sample_data::sample_spans;
use crate::store::TraceStore;
use crate::telemetry::SpanData;

const TRACES_ENDPOINT_PATH: &str = "/api/traces";
const TRACE_ID_ENDPOINT_PREFIX: &str = "/api/traces/";
const CLEAR_DATA_ENDPOINT_PATH: &str = "/api/clearData";
const SAMPLE_DATA_ENDPOINT_PATH: &str = "/api/sampleData";
const SPANS_ENDPOINT_PATH: &str = "/api/spans";

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// HTTP front end of a trace store. The store is owned by the caller, which is
/// also responsible for closing it once the server has stopped.
pub struct DesktopServer {
    pub config: Arc<Config>,
    pub store: Arc<dyn TraceStore + Send + Sync>,
}

impl DesktopServer {
    /// Binds the configured address and serves until `shutdown` is cancelled.
    pub async fn start(&self, shutdown: CancellationToken) -> ServeResult {
        let now = Instant::now();
        let listener = TcpListener::bind(self.config.addr()).await?;
        debug!(
            "Time taken to start the desktop server: {} ms",
            now.elapsed().as_millis()
        );
        self.serve(listener, shutdown).await
    }

    /// Serves requests from `listener` until `shutdown` is cancelled.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> ServeResult {
        let store = self.store.clone();
        let endpoint_config = self.config.clone();
        let request_shutdown = shutdown.clone();

        let service = service_fn(move |req| {
            // called for each http request
            DesktopServer::endpoint_handler(
                endpoint_config.clone(),
                req,
                store.clone(),
                request_shutdown.clone(),
            )
        });

        info!("Desktop server listening on {}", listener.local_addr()?);

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                _ = shutdown.cancelled() => break,
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }

        info!("Desktop server shutting down");
        joinset.shutdown().await;
        Ok(())
    }

    async fn endpoint_handler(
        config: Arc<Config>,
        req: Request<Incoming>,
        store: Arc<dyn TraceStore + Send + Sync>,
        shutdown: CancellationToken,
    ) -> http::Result<HttpResponse> {
        debug!("{} {}", req.method(), req.uri().path());
        match (req.method(), req.uri().path()) {
            (&Method::GET, TRACES_ENDPOINT_PATH) => Self::traces_handler(store).await,
            (&Method::GET, CLEAR_DATA_ENDPOINT_PATH) => Self::clear_data_handler(store).await,
            (&Method::GET, SAMPLE_DATA_ENDPOINT_PATH) => {
                Self::sample_data_handler(store, shutdown).await
            }
            (&Method::POST, SPANS_ENDPOINT_PATH) => {
                Self::spans_handler(config, req, store, shutdown).await
            }
            (&Method::GET, path) if path.starts_with(TRACE_ID_ENDPOINT_PREFIX) => {
                let trace_id = &path[TRACE_ID_ENDPOINT_PREFIX.len()..];
                Self::trace_id_handler(store, trace_id).await
            }
            _ => log_and_create_http_response(
                &format!("No route for {} {}", req.method(), req.uri().path()),
                StatusCode::NOT_FOUND,
            ),
        }
    }

    async fn traces_handler(
        store: Arc<dyn TraceStore + Send + Sync>,
    ) -> http::Result<HttpResponse> {
        match store.get_trace_summaries().await {
            Ok(summaries) => create_json_http_response(&summaries),
            Err(err) => create_store_error_http_response("Listing trace summaries", &err),
        }
    }

    async fn trace_id_handler(
        store: Arc<dyn TraceStore + Send + Sync>,
        trace_id: &str,
    ) -> http::Result<HttpResponse> {
        match store.get_trace(trace_id).await {
            Ok(trace) => create_json_http_response(&trace),
            Err(err) => create_store_error_http_response("Trace lookup", &err),
        }
    }

    async fn clear_data_handler(
        store: Arc<dyn TraceStore + Send + Sync>,
    ) -> http::Result<HttpResponse> {
        match store.clear_traces().await {
            Ok(()) => log_and_create_http_response("Cleared all traces", StatusCode::OK),
            Err(err) => create_store_error_http_response("Clearing traces", &err),
        }
    }

    async fn sample_data_handler(
        store: Arc<dyn TraceStore + Send + Sync>,
        shutdown: CancellationToken,
    ) -> http::Result<HttpResponse> {
        let spans = match sample_spans() {
            Ok(spans) => spans,
            Err(err) => {
                error!("Error decoding sample data: {err}");
                return log_and_create_http_response(
                    "Error loading sample data",
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        };
        Self::ingest(store, shutdown, spans, "Loading sample data").await
    }

    /// Accepts a JSON array of spans.
    async fn spans_handler(
        config: Arc<Config>,
        req: Request<Incoming>,
        store: Arc<dyn TraceStore + Send + Sync>,
        shutdown: CancellationToken,
    ) -> http::Result<HttpResponse> {
        let (parts, body) = req.into_parts();
        if let Some(response) = verify_request_content_length(
            &parts.headers,
            config.max_request_content_length,
            "Error processing spans",
        ) {
            return response;
        }

        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading spans request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        // double check the size in case transfer encoding is used
        if body_bytes.len() > config.max_request_content_length {
            return log_and_create_http_response(
                "Error processing spans: Payload too large",
                StatusCode::PAYLOAD_TOO_LARGE,
            );
        }

        let spans: Vec<SpanData> = match serde_json::from_slice(&body_bytes) {
            Ok(spans) => spans,
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error deserializing spans from request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };
        Self::ingest(store, shutdown, spans, "Span ingestion").await
    }

    async fn ingest(
        store: Arc<dyn TraceStore + Send + Sync>,
        shutdown: CancellationToken,
        spans: Vec<SpanData>,
        operation: &str,
    ) -> http::Result<HttpResponse> {
        let span_count = spans.len();
        // ingestion stops early if the server is shutting down
        let cancel = shutdown.child_token();
        match store.add_spans(&cancel, spans).await {
            Ok(()) => log_and_create_http_response(
                &format!("Successfully stored {span_count} spans"),
                StatusCode::OK,
            ),
            Err(err) => create_store_error_http_response(operation, &err),
        }
    }
}
