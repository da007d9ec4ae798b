/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Error types for the relay.
//!
//! Expected races are not errors here. A completion or claim that loses to
//! another writer comes back as `false`/`None` from the store and the engine,
//! and an unknown identifier on a lookup is `None`. What remains are the
//! failures a caller genuinely has to handle:
//!
//! - [`StoreError`]: storage-layer failures (pool, SQL, corrupt rows) plus the
//!   one allocator-level refusal, an unprovisioned category.
//! - [`RelayError`]: what the [`RelayEngine`](crate::RelayEngine) surfaces to
//!   transports, mapped by them to 400/404/500-class responses.

use thiserror::Error;

/// Errors raised by the Request Store and Identifier Allocator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection pool could not hand out a connection, or the blocking
    /// interaction with it was aborted.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// The category has no counter row. Categories must be provisioned
    /// before their first request.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// A status string that is not part of the request lifecycle, or a
    /// lifecycle status that is not valid for the attempted transition.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid timestamp in column {column}: {value}")]
    Timestamp { column: &'static str, value: String },

    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the relay engine to its transports.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required field was missing or malformed. Nothing was persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CategoryNotFound(category) => RelayError::UnknownCategory(category),
            StoreError::InvalidStatus(status) => {
                RelayError::Validation(format!("status '{}' is not allowed here", status))
            }
            other => RelayError::Store(other),
        }
    }
}

impl RelayError {
    /// True for failures the caller caused (bad input, unknown names), false
    /// for storage failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RelayError::Store(_))
    }
}
