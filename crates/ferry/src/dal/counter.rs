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

//! Identifier Allocator
//!
//! One counter row per category. Allocation is increment-then-read inside a
//! `BEGIN IMMEDIATE` transaction, so two callers racing on the same category
//! always observe different values and a rolled-back allocation leaves the
//! counter untouched.
//!
//! Identifiers are the counter value zero-padded to five digits. Past 99999
//! they simply grow wider; they stay unique but stop sorting lexically, which
//! is fine because ordering always uses `created_at`.

use super::models::{NewSqliteCounter, SqliteCounter};
use super::DAL;
use crate::database::schema::counters;
use crate::error::StoreError;
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::{debug, info};

/// Width of the zero-padded identifier.
pub const IDENTIFIER_WIDTH: usize = 5;

/// Formats a counter value as an external identifier.
pub fn format_identifier(value: i64) -> String {
    format!("{:0width$}", value, width = IDENTIFIER_WIDTH)
}

/// Increments and reads back the counter for `category`.
///
/// Must be called inside an immediate transaction; [`RequestDAL::create`]
/// reuses it so allocation and insertion commit together.
///
/// [`RequestDAL::create`]: super::RequestDAL::create
pub(crate) fn allocate(conn: &mut SqliteConnection, category: &str) -> Result<String, StoreError> {
    let updated = diesel::update(counters::table.find(category))
        .set(counters::counter.eq(counters::counter + 1_i64))
        .execute(conn)?;

    if updated == 0 {
        return Err(StoreError::CategoryNotFound(category.to_string()));
    }

    let value: i64 = counters::table
        .find(category)
        .select(counters::counter)
        .first(conn)?;

    Ok(format_identifier(value))
}

/// Data access for per-category identifier counters.
#[derive(Clone)]
pub struct CounterDAL<'a> {
    dal: &'a DAL,
}

impl<'a> CounterDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Allocates the next identifier for `category`.
    ///
    /// Fails with [`StoreError::CategoryNotFound`] when the category was never
    /// provisioned.
    pub async fn next(&self, category: &str) -> Result<String, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let identifier = conn
            .interact(move |conn| conn.immediate_transaction(|conn| allocate(conn, &category)))
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(identifier)
    }

    /// Creates the counter row for `category` if it does not exist yet.
    ///
    /// Returns `true` when the category was newly provisioned. Existing
    /// counters are never reset.
    pub async fn provision(&self, category: &str) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let new_counter = NewSqliteCounter {
            category: category.to_string(),
            counter: 0,
        };

        let inserted = conn
            .interact(move |conn| {
                diesel::insert_or_ignore_into(counters::table)
                    .values(&new_counter)
                    .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        if inserted > 0 {
            info!(category = %category, "Provisioned category");
        } else {
            debug!(category = %category, "Category already provisioned");
        }

        Ok(inserted > 0)
    }

    /// Lists every provisioned category in name order.
    pub async fn list_categories(&self) -> Result<Vec<String>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let categories = conn
            .interact(|conn| {
                counters::table
                    .select(counters::category)
                    .order(counters::category.asc())
                    .load::<String>(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(categories)
    }

    /// Returns the last value handed out for `category`, if provisioned.
    pub async fn current(&self, category: &str) -> Result<Option<i64>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let category = category.to_string();
        let row = conn
            .interact(move |conn| {
                counters::table
                    .find(category)
                    .select(SqliteCounter::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(row.map(|r| r.counter))
    }
}
