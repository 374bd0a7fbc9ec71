// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// maximum number of traces held at once. `None` keeps every trace until cleared
    pub max_traces: Option<usize>,
    pub max_request_content_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            max_traces: None,
            max_request_content_length: 10 * 1024 * 1024, // 10MB in Bytes
        }
    }
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        let host = env::var("DESKTOP_VIEWER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match env::var("DESKTOP_VIEWER_PORT") {
            Ok(port) => port.parse::<u16>().map_err(|_| {
                anyhow::anyhow!("DESKTOP_VIEWER_PORT is not a valid port: {port}")
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let log_level = env::var("DESKTOP_VIEWER_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let max_traces = match env::var("DESKTOP_VIEWER_MAX_TRACES") {
            Ok(max) => match max.parse::<usize>() {
                Ok(max) if max > 0 => Some(max),
                _ => {
                    return Err(anyhow::anyhow!(
                        "DESKTOP_VIEWER_MAX_TRACES must be a positive integer: {max}"
                    )
                    .into())
                }
            },
            Err(_) => None,
        };

        Ok(Config {
            host,
            port,
            log_level,
            max_traces,
            ..Default::default()
        })
    }

    /// Address the HTTP server listens on, as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
