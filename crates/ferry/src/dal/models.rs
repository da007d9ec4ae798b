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

//! SQLite row models
//!
//! Diesel models using SQLite-compatible types: timestamps as TEXT, the
//! payload as JSON TEXT and the status as its lowercase name. They are
//! converted to and from domain types at the DAL boundary.

use crate::database::schema::{counters, requests};
use crate::database::universal_types::UniversalTimestamp;
use crate::error::StoreError;
use crate::models::request::Request;
use diesel::prelude::*;

// ============================================================================
// Request Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteRequest {
    pub id: i32,
    pub category: String,
    pub identifier: String,
    pub callback_url: String,
    pub payload: Option<String>,
    pub status: String,
    pub locked_by: Option<String>,
    pub locked_at: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = requests)]
pub struct NewSqliteRequest {
    pub category: String,
    pub identifier: String,
    pub callback_url: String,
    pub payload: Option<String>,
    pub status: String,
    pub created_at: String,
}

// ============================================================================
// Counter Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = counters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteCounter {
    pub category: String,
    pub counter: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counters)]
pub struct NewSqliteCounter {
    pub category: String,
    pub counter: i64,
}

// ============================================================================
// Conversions
// ============================================================================

fn parse_timestamp(column: &'static str, value: &str) -> Result<UniversalTimestamp, StoreError> {
    UniversalTimestamp::from_rfc3339(value).map_err(|_| StoreError::Timestamp {
        column,
        value: value.to_string(),
    })
}

fn parse_optional_timestamp(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<UniversalTimestamp>, StoreError> {
    value.map(|v| parse_timestamp(column, v)).transpose()
}

impl TryFrom<SqliteRequest> for Request {
    type Error = StoreError;

    fn try_from(row: SqliteRequest) -> Result<Self, Self::Error> {
        let payload = row
            .payload
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?;

        Ok(Request {
            status: row.status.parse()?,
            locked_at: parse_optional_timestamp("locked_at", row.locked_at.as_deref())?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            completed_at: parse_optional_timestamp("completed_at", row.completed_at.as_deref())?,
            category: row.category,
            identifier: row.identifier,
            callback_url: row.callback_url,
            payload,
            locked_by: row.locked_by,
        })
    }
}

/// Converts a batch of rows, failing on the first corrupt one.
pub(crate) fn into_requests(rows: Vec<SqliteRequest>) -> Result<Vec<Request>, StoreError> {
    rows.into_iter().map(Request::try_from).collect()
}
