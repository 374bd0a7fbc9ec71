// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use desktop_exporter::{
    config::Config,
    server::DesktopServer,
    store::{MemoryStore, TraceStore},
};

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
pub async fn main() {
    let config = Config::new();

    let log_level = config
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let env_filter = format!("h2=off,hyper=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on desktop viewer startup: {e}");
            return;
        }
    };

    let store = Arc::new(match config.max_traces {
        Some(max_traces) => MemoryStore::with_capacity(max_traces),
        None => MemoryStore::new(),
    });

    let server = DesktopServer {
        config: Arc::clone(&config),
        store: store.clone(),
    };

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let mut server_handle = tokio::spawn(async move { server.start(server_shutdown).await });

    let server_finished = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(e) => error!("Unable to listen for shutdown signal: {e}"),
            }
            false
        },
        res = &mut server_handle => {
            match res {
                Ok(Ok(())) => info!("Desktop server stopped"),
                Ok(Err(e)) => error!("Desktop server error: {e}"),
                Err(e) => error!("Desktop server task failed: {e}"),
            }
            true
        },
    };

    shutdown.cancel();
    if !server_finished {
        match server_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Desktop server error during shutdown: {e}"),
            Err(e) => error!("Desktop server task failed during shutdown: {e}"),
        }
    }

    if let Err(e) = store.close().await {
        error!("Error closing trace store: {e}");
    }
}
