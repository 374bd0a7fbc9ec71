// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors returned by trace store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid span data: {0}")]
    Validation(String),

    #[error("Trace not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Trace store is closed")]
    Closed,
}

impl StoreError {
    /// True for errors caused by the caller's request rather than by the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
