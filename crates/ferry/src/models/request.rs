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

//! Request Model
//!
//! A request is one unit of relayed work, addressed by `(category, identifier)`.
//! Its status only moves forward:
//!
//! ```text
//! pending --claim--> locked --report--> success | failed
//! pending --report--> success | failed
//! pending --janitor--> timeout
//! locked --stale release--> pending
//! ```
//!
//! `success`, `failed` and `timeout` are terminal and absorbing.

use crate::database::universal_types::UniversalTimestamp;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Admitted, waiting for a worker.
    Pending,
    /// Claimed by a worker that has not reported yet.
    Locked,
    Success,
    Failed,
    /// No worker reported before the timeout threshold.
    Timeout,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Locked => "locked",
            RequestStatus::Success => "success",
            RequestStatus::Failed => "failed",
            RequestStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Success | RequestStatus::Failed | RequestStatus::Timeout
        )
    }

    /// Statuses a worker may report. Timeouts are only ever set by the janitor.
    pub fn is_reportable(&self) -> bool {
        matches!(self, RequestStatus::Success | RequestStatus::Failed)
    }
}

impl FromStr for RequestStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "locked" => Ok(RequestStatus::Locked),
            "success" => Ok(RequestStatus::Success),
            "failed" => Ok(RequestStatus::Failed),
            "timeout" => Ok(RequestStatus::Timeout),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored request (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub category: String,
    pub identifier: String,
    /// Where the terminal result is delivered.
    pub callback_url: String,
    /// Originator context, forwarded to workers untouched.
    pub payload: Option<serde_json::Value>,
    pub status: RequestStatus,
    /// Worker currently holding the request, or the worker that completed it.
    pub locked_by: Option<String>,
    pub locked_at: Option<UniversalTimestamp>,
    pub created_at: UniversalTimestamp,
    /// Set if and only if `status` is terminal.
    pub completed_at: Option<UniversalTimestamp>,
}

impl Request {
    pub fn result(&self) -> RequestResult {
        RequestResult {
            category: self.category.clone(),
            identifier: self.identifier.clone(),
            status: self.status,
            locked_by: self.locked_by.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// The lightweight view originators poll while waiting for completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub category: String,
    pub identifier: String,
    pub status: RequestStatus,
    pub locked_by: Option<String>,
    pub completed_at: Option<UniversalTimestamp>,
}

/// One entry of the pull listing handed to polling workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub category: String,
    pub identifier: String,
    /// Fetchable link to the full request detail.
    pub dereference_url: String,
    pub created_at: UniversalTimestamp,
    pub payload: Option<serde_json::Value>,
}
