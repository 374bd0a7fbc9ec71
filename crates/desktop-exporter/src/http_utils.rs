// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use http_body_util::Full;
use hyper::{
    body::Bytes,
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use crate::error::StoreError;

pub type HttpResponse = Response<Full<Bytes>>;

/// Does two things:
/// 1. Logs the given message. A success status code (within 200-299) will cause a debug log to be
///    written, otherwise error will be written.
/// 2. Returns the given message in the body of JSON response with the given status code.
///
/// Response body format:
/// {
///     "message": message
/// }
pub fn log_and_create_http_response(
    message: &str,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    json_response(body, status)
}

/// Serializes `payload` as the JSON body of a 200 response.
pub fn create_json_http_response<T: Serialize>(payload: &T) -> http::Result<HttpResponse> {
    match serde_json::to_string(payload) {
        Ok(body) => json_response(body, StatusCode::OK),
        Err(err) => log_and_create_http_response(
            &format!("Error serializing response body: {err}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Turns a store error into a response.
///
/// Unknown trace ids are the caller's fault and get a 400 carrying the error
/// text. Everything else is logged in full and answered with a 500 whose body
/// only names the operation.
pub fn create_store_error_http_response(
    operation: &str,
    err: &StoreError,
) -> http::Result<HttpResponse> {
    if err.is_client_error() {
        return log_and_create_http_response(&err.to_string(), StatusCode::BAD_REQUEST);
    }
    error!("{operation} failed: {err}");
    let body = json!({ "message": format!("{operation} failed") }).to_string();
    json_response(body, StatusCode::INTERNAL_SERVER_ERROR)
}

fn json_response(body: String, status: StatusCode) -> http::Result<HttpResponse> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// Takes a request's header map, and verifies that the "content-length" and/or "Transfer-Encoding" header
/// is present, valid, and less than the given max_content_length.
///
/// Will return None if no issues are found. Otherwise logs an error (with the given prefix) and
/// returns and HTTP Response with the appropriate error status code.
pub fn verify_request_content_length(
    header_map: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let content_length_header = match header_map.get(header::CONTENT_LENGTH) {
        Some(res) => res,
        None => {
            if let Some(transfer_encoding_header) = header_map.get(header::TRANSFER_ENCODING) {
                debug!(
                    "Transfer-Encoding header is present: {:?}",
                    transfer_encoding_header
                );
                return None;
            }
            return Some(log_and_create_http_response(
                &format!(
                    "{error_message_prefix}: Missing Content-Length and Transfer-Encoding header"
                ),
                StatusCode::LENGTH_REQUIRED,
            ));
        }
    };
    let content_length = match content_length_header
        .to_str()
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        Some(res) => res,
        None => {
            return Some(log_and_create_http_response(
                &format!("{error_message_prefix}: Invalid Content-Length header"),
                StatusCode::BAD_REQUEST,
            ));
        }
    };
    if content_length > max_content_length {
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Payload too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    None
}
