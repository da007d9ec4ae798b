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

//! Request Store
//!
//! Durable request records keyed by `(category, identifier)`.
//!
//! Three writers share this table with no lock between them: HTTP handlers,
//! WebSocket handlers and the janitor. Every transition that decides a race is
//! therefore one statement whose `WHERE` clause re-checks the current status:
//!
//! - [`complete`](RequestDAL::complete) matches `pending | locked` only,
//! - [`lock`](RequestDAL::lock) matches `pending` with no holder only,
//! - [`escalate_timeouts`](RequestDAL::escalate_timeouts) selects and updates
//!   under one `BEGIN IMMEDIATE`, so a row is never returned twice.
//!
//! The bulk maintenance operations are scoped to one category and take
//! absolute cutoffs; callers compute them from their clock.

use super::counter::allocate;
use super::models::{into_requests, NewSqliteRequest, SqliteRequest};
use super::DAL;
use crate::database::schema::requests;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::StoreError;
use crate::models::request::{Request, RequestStatus};
use diesel::prelude::*;
use tracing::debug;

fn open_statuses() -> Vec<&'static str> {
    vec![RequestStatus::Pending.as_str(), RequestStatus::Locked.as_str()]
}

fn terminal_statuses() -> Vec<&'static str> {
    vec![
        RequestStatus::Success.as_str(),
        RequestStatus::Failed.as_str(),
        RequestStatus::Timeout.as_str(),
    ]
}

/// Data access for request records.
#[derive(Clone)]
pub struct RequestDAL<'a> {
    dal: &'a DAL,
}

impl<'a> RequestDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Allocates an identifier and inserts a `pending` request.
    ///
    /// Allocation and insertion share one immediate transaction: if the insert
    /// fails the counter increment rolls back with it.
    pub async fn create(
        &self,
        category: &str,
        callback_url: &str,
        payload: Option<serde_json::Value>,
        now: UniversalTimestamp,
    ) -> Result<Request, StoreError> {
        let payload_text = payload.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category_owned = category.to_string();
        let callback_owned = callback_url.to_string();
        let created_at = now.to_storage();

        let identifier = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, StoreError, _>(|conn| {
                    let identifier = allocate(conn, &category_owned)?;

                    let new_request = NewSqliteRequest {
                        category: category_owned.clone(),
                        identifier: identifier.clone(),
                        callback_url: callback_owned,
                        payload: payload_text,
                        status: RequestStatus::Pending.as_str().to_string(),
                        created_at,
                    };

                    diesel::insert_into(requests::table)
                        .values(&new_request)
                        .execute(conn)?;

                    Ok(identifier)
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        debug!(category = %category, identifier = %identifier, "Request stored");

        Ok(Request {
            category: category.to_string(),
            identifier,
            callback_url: callback_url.to_string(),
            payload,
            status: RequestStatus::Pending,
            locked_by: None,
            locked_at: None,
            created_at: now,
            completed_at: None,
        })
    }

    /// Reads one request, `None` if it does not exist.
    pub async fn get(
        &self,
        category: &str,
        identifier: &str,
    ) -> Result<Option<Request>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let identifier = identifier.to_string();

        let row: Option<SqliteRequest> = conn
            .interact(move |conn| {
                requests::table
                    .filter(requests::category.eq(category))
                    .filter(requests::identifier.eq(identifier))
                    .select(SqliteRequest::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        row.map(Request::try_from).transpose()
    }

    /// Snapshot of every `pending` request across all categories, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<Request>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let rows: Vec<SqliteRequest> = conn
            .interact(|conn| {
                requests::table
                    .filter(requests::status.eq(RequestStatus::Pending.as_str()))
                    .order((requests::created_at.asc(), requests::id.asc()))
                    .select(SqliteRequest::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        into_requests(rows)
    }

    /// Moves a `pending` or `locked` request to a terminal status.
    ///
    /// Returns the completed record when this call won, `None` when the
    /// request was already terminal or does not exist. The status guard in
    /// the `UPDATE` is the idempotency boundary; the read-back only runs after
    /// the update matched, inside the same transaction.
    ///
    /// Only `success` and `failed` may be reported; anything else is
    /// [`StoreError::InvalidStatus`].
    pub async fn complete(
        &self,
        category: &str,
        identifier: &str,
        status: RequestStatus,
        worker_id: &str,
        now: UniversalTimestamp,
    ) -> Result<Option<Request>, StoreError> {
        if !status.is_reportable() {
            return Err(StoreError::InvalidStatus(status.as_str().to_string()));
        }

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let identifier = identifier.to_string();
        let worker_id = worker_id.to_string();
        let completed_at = now.to_storage();

        let row: Option<SqliteRequest> = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, StoreError, _>(|conn| {
                    let updated = diesel::update(
                        requests::table
                            .filter(requests::category.eq(&category))
                            .filter(requests::identifier.eq(&identifier))
                            .filter(requests::status.eq_any(open_statuses())),
                    )
                    .set((
                        requests::status.eq(status.as_str()),
                        requests::completed_at.eq(Some(completed_at)),
                        requests::locked_by.eq(Some(worker_id)),
                    ))
                    .execute(conn)?;

                    if updated == 0 {
                        return Ok(None);
                    }

                    let row: SqliteRequest = requests::table
                        .filter(requests::category.eq(&category))
                        .filter(requests::identifier.eq(&identifier))
                        .select(SqliteRequest::as_select())
                        .first(conn)?;

                    Ok(Some(row))
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        row.map(Request::try_from).transpose()
    }

    /// Claims an unheld `pending` request for `worker_id`.
    ///
    /// Returns `false` when the request is already held, terminal or unknown.
    pub async fn lock(
        &self,
        category: &str,
        identifier: &str,
        worker_id: &str,
        now: UniversalTimestamp,
    ) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let identifier = identifier.to_string();
        let worker_id = worker_id.to_string();
        let locked_at = now.to_storage();

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    requests::table
                        .filter(requests::category.eq(category))
                        .filter(requests::identifier.eq(identifier))
                        .filter(requests::status.eq(RequestStatus::Pending.as_str()))
                        .filter(requests::locked_by.is_null()),
                )
                .set((
                    requests::status.eq(RequestStatus::Locked.as_str()),
                    requests::locked_by.eq(Some(worker_id)),
                    requests::locked_at.eq(Some(locked_at)),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    /// Releases locks taken before `cutoff`, returning the requests to `pending`.
    ///
    /// Terminal rows never match.
    pub async fn release_stale_locks(
        &self,
        category: &str,
        cutoff: UniversalTimestamp,
    ) -> Result<usize, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let cutoff = cutoff.to_storage();

        let released = conn
            .interact(move |conn| {
                diesel::update(
                    requests::table
                        .filter(requests::category.eq(category))
                        .filter(requests::status.eq_any(open_statuses()))
                        .filter(requests::locked_at.lt(cutoff)),
                )
                .set((
                    requests::status.eq(RequestStatus::Pending.as_str()),
                    requests::locked_by.eq(None::<String>),
                    requests::locked_at.eq(None::<String>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(released)
    }

    /// Transitions every `pending` request created before `cutoff` to
    /// `timeout` and returns them as they were before the transition.
    ///
    /// Selection and update run under one immediate transaction, and the
    /// update re-checks `pending`, so concurrent or repeated scans never
    /// return the same request twice. If any selected row cannot be decoded
    /// the call fails and every row stays `pending`.
    pub async fn escalate_timeouts(
        &self,
        category: &str,
        cutoff: UniversalTimestamp,
        now: UniversalTimestamp,
    ) -> Result<Vec<Request>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let cutoff = cutoff.to_storage();
        let completed_at = now.to_storage();

        let expired: Vec<Request> = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, StoreError, _>(|conn| {
                    let rows: Vec<SqliteRequest> = requests::table
                        .filter(requests::category.eq(&category))
                        .filter(requests::status.eq(RequestStatus::Pending.as_str()))
                        .filter(requests::created_at.lt(&cutoff))
                        .order((requests::created_at.asc(), requests::id.asc()))
                        .select(SqliteRequest::as_select())
                        .load(conn)?;

                    if rows.is_empty() {
                        return Ok(Vec::new());
                    }

                    // Decode before the transition so a corrupt row rolls it back.
                    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
                    let expired = into_requests(rows)?;

                    diesel::update(
                        requests::table
                            .filter(requests::id.eq_any(ids))
                            .filter(requests::status.eq(RequestStatus::Pending.as_str())),
                    )
                    .set((
                        requests::status.eq(RequestStatus::Timeout.as_str()),
                        requests::completed_at.eq(Some(completed_at)),
                    ))
                    .execute(conn)?;

                    Ok(expired)
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(expired)
    }

    /// Deletes terminal requests completed before `cutoff`.
    ///
    /// Non-terminal rows are never deleted, whatever their age.
    pub async fn purge(
        &self,
        category: &str,
        cutoff: UniversalTimestamp,
    ) -> Result<usize, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let cutoff = cutoff.to_storage();

        let deleted: usize = conn
            .interact(move |conn| {
                diesel::delete(
                    requests::table
                        .filter(requests::category.eq(category))
                        .filter(requests::status.eq_any(terminal_statuses()))
                        .filter(requests::completed_at.lt(cutoff)),
                )
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(deleted)
    }

    /// Counts the rows [`purge`](Self::purge) would delete.
    pub async fn count_purgeable(
        &self,
        category: &str,
        cutoff: UniversalTimestamp,
    ) -> Result<i64, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let cutoff = cutoff.to_storage();

        let count: i64 = conn
            .interact(move |conn| {
                requests::table
                    .filter(requests::category.eq(category))
                    .filter(requests::status.eq_any(terminal_statuses()))
                    .filter(requests::completed_at.lt(cutoff))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }
}
