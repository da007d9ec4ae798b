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

//! JSON bodies exchanged with originators and workers.
//!
//! Requests are addressed on the wire as `(category, request_id)`. Older
//! clients send `genre` for the category and `pc_id` for the worker id; both
//! are accepted as aliases.

use ferry::{
    Admission, PendingRequest, RelayEvent, Request, RequestResult, RequestStatus,
    UniversalTimestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::error::ApiError;

/// Status assumed when a completion does not say how it went.
pub const DEFAULT_REPORTED_STATUS: &str = "failed";

/// Worker id recorded when a completion does not name its worker.
pub const UNKNOWN_WORKER: &str = "unknown";

#[derive(Debug, Default, Deserialize)]
pub struct CreateRequestBody {
    #[serde(default, alias = "genre")]
    pub category: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub status: &'static str,
    pub category: String,
    pub request_id: String,
    pub url: String,
}

impl From<Admission> for CreatedResponse {
    fn from(admission: Admission) -> Self {
        Self {
            status: "created",
            category: admission.category,
            request_id: admission.identifier,
            url: admission.dereference_url,
        }
    }
}

/// Full request record.
#[derive(Debug, Serialize)]
pub struct RequestRecord {
    pub category: String,
    pub request_id: String,
    pub callback_url: String,
    pub status: RequestStatus,
    pub locked_by: Option<String>,
    pub locked_at: Option<UniversalTimestamp>,
    pub created_at: UniversalTimestamp,
    pub completed_at: Option<UniversalTimestamp>,
    pub data: Option<Value>,
}

impl From<Request> for RequestRecord {
    fn from(request: Request) -> Self {
        Self {
            category: request.category,
            request_id: request.identifier,
            callback_url: request.callback_url,
            status: request.status,
            locked_by: request.locked_by,
            locked_at: request.locked_at,
            created_at: request.created_at,
            completed_at: request.completed_at,
            data: request.payload,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultRecord {
    pub category: String,
    pub request_id: String,
    pub status: RequestStatus,
    pub locked_by: Option<String>,
    pub completed_at: Option<UniversalTimestamp>,
}

impl From<RequestResult> for ResultRecord {
    fn from(result: RequestResult) -> Self {
        Self {
            category: result.category,
            request_id: result.identifier,
            status: result.status,
            locked_by: result.locked_by,
            completed_at: result.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingRecord {
    pub category: String,
    pub request_id: String,
    pub url: String,
    pub created_at: UniversalTimestamp,
    pub data: Option<Value>,
}

impl From<PendingRequest> for PendingRecord {
    fn from(pending: PendingRequest) -> Self {
        Self {
            category: pending.category,
            request_id: pending.identifier,
            url: pending.dereference_url,
            created_at: pending.created_at,
            data: pending.payload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClaimBody {
    #[serde(default, alias = "pc_id")]
    pub worker_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "pc_id")]
    pub worker_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseBody {
    #[serde(default, alias = "genre")]
    pub category: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "pc_id")]
    pub worker_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

/// Messages a worker sends over the WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ReportResult {
        #[serde(alias = "genre")]
        category: String,
        request_id: String,
        #[serde(default)]
        status: Option<String>,
        #[serde(default, alias = "pc_id")]
        worker_id: Option<String>,
    },
    Claim {
        #[serde(alias = "genre")]
        category: String,
        request_id: String,
        #[serde(alias = "pc_id")]
        worker_id: String,
    },
}

/// Messages the server pushes over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    NewRequest {
        category: String,
        request_id: String,
        url: String,
        created_at: UniversalTimestamp,
    },
    RequestCompleted {
        category: String,
        request_id: String,
        status: RequestStatus,
        worker_id: Option<String>,
    },
    ReportAck {
        category: String,
        request_id: String,
        accepted: bool,
    },
    ClaimAck {
        category: String,
        request_id: String,
        locked: bool,
    },
    Error {
        message: String,
    },
}

impl From<RelayEvent> for ServerMessage {
    fn from(event: RelayEvent) -> Self {
        match event {
            RelayEvent::RequestAdmitted {
                category,
                identifier,
                dereference_url,
                created_at,
            } => ServerMessage::NewRequest {
                category,
                request_id: identifier,
                url: dereference_url,
                created_at,
            },
            RelayEvent::RequestCompleted {
                category,
                identifier,
                status,
                worker_id,
            } => ServerMessage::RequestCompleted {
                category,
                request_id: identifier,
                status,
                worker_id,
            },
        }
    }
}

/// Parses the status a worker reported, defaulting to `failed`.
pub fn parse_reported_status(raw: Option<&str>) -> Result<RequestStatus, ApiError> {
    let raw = raw.map(str::trim).unwrap_or(DEFAULT_REPORTED_STATUS);
    RequestStatus::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("status '{}' is not recognised", raw)))
}

/// The worker id a report is recorded under.
pub fn reporting_worker(raw: Option<String>) -> String {
    raw.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN_WORKER.to_string())
}

/// A required string field, trimmed.
pub fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}
