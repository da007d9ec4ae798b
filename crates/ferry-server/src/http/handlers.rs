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

//! HTTP handlers for originators and workers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::debug;

use super::error::ApiError;
use super::wire::*;
use super::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;

pub(crate) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/request`
pub(crate) async fn create_request(
    State(state): State<AppState>,
    body: Body<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let category = required(body.category, "category")?;
    let callback_url = required(body.callback_url, "callback_url")?;

    let admission = state
        .engine
        .submit(&category, &callback_url, body.data)
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse::from(admission))))
}

/// `GET /api/request/{category}/{request_id}`
pub(crate) async fn get_request(
    State(state): State<AppState>,
    Path((category, request_id)): Path<(String, String)>,
) -> Result<Json<RequestRecord>, ApiError> {
    state
        .engine
        .get(&category, &request_id)
        .await?
        .map(|request| Json(RequestRecord::from(request)))
        .ok_or_else(|| ApiError::NotFound("Request not found".to_string()))
}

/// `GET /api/request-result/{category}/{request_id}`
pub(crate) async fn get_request_result(
    State(state): State<AppState>,
    Path((category, request_id)): Path<(String, String)>,
) -> Result<Json<ResultRecord>, ApiError> {
    state
        .engine
        .get_result(&category, &request_id)
        .await?
        .map(|result| Json(ResultRecord::from(result)))
        .ok_or_else(|| ApiError::NotFound("Request not found".to_string()))
}

/// `GET /api/pending-requests`
pub(crate) async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingRecord>>, ApiError> {
    let pending = state.engine.list_pending().await?;
    debug!(count = pending.len(), "Listing pending requests");
    Ok(Json(pending.into_iter().map(PendingRecord::from).collect()))
}

/// `POST /api/request/{category}/{request_id}/claim`
pub(crate) async fn claim_request(
    State(state): State<AppState>,
    Path((category, request_id)): Path<(String, String)>,
    body: Body<ClaimBody>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let Json(body) = body?;
    let worker_id = required(body.worker_id, "worker_id")?;

    let locked = state.engine.claim(&category, &request_id, &worker_id).await?;
    Ok(Json(ClaimResponse { locked }))
}

/// `POST /api/request/{category}/{request_id}/complete`
pub(crate) async fn complete_request(
    State(state): State<AppState>,
    Path((category, request_id)): Path<(String, String)>,
    body: Body<CompleteBody>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let Json(body) = body?;
    let status = parse_reported_status(body.status.as_deref())?;
    let worker_id = reporting_worker(body.worker_id);

    let accepted = state
        .engine
        .report_result(&category, &request_id, status, &worker_id)
        .await?;
    Ok(Json(AcceptedResponse { accepted }))
}

/// `POST /api/response`
pub(crate) async fn receive_response(
    State(state): State<AppState>,
    body: Body<ResponseBody>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let Json(body) = body?;
    let category = required(body.category, "category")?;
    let request_id = required(body.request_id, "request_id")?;
    let status = parse_reported_status(body.status.as_deref())?;
    let worker_id = reporting_worker(body.worker_id);

    let accepted = state
        .engine
        .report_result(&category, &request_id, status, &worker_id)
        .await?;
    Ok(Json(AcceptedResponse { accepted }))
}
