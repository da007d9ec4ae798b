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

//! SQLite connection management.
//!
//! This module wraps a `deadpool-diesel` pool around the relay's SQLite file.
//! The pool holds a single connection, which makes the store a single writer:
//! every statement the HTTP handlers, WebSocket handlers and janitor issue is
//! applied one at a time, and the conditional updates in the DAL decide races.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry::Database;
//!
//! # async fn example() -> Result<(), ferry::database::connection::DatabaseError> {
//! let db = Database::try_new("sqlite://relay.db")?;
//! db.run_migrations().await?;
//! # Ok(())
//! # }
//! ```

use deadpool_diesel::sqlite::{
    Manager as SqliteManager, Pool as SqlitePool, Runtime as SqliteRuntime,
};
use thiserror::Error;
use tracing::info;

/// SQLite accepts one writer at a time even in WAL mode.
const SQLITE_POOL_SIZE: usize = 1;

/// Errors raised while opening or migrating the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to create SQLite connection pool: {0}")]
    PoolCreation(String),

    #[error("Failed to acquire a connection: {0}")]
    Connection(String),

    #[error("Failed to run migrations: {0}")]
    Migration(String),
}

/// Shared handle to the relay database.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    url: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("url", &self.url).finish()
    }
}

impl Database {
    /// Opens a pool for the given SQLite location.
    ///
    /// Accepts a plain file path, a `sqlite://` prefixed path, a `file:` URI or
    /// `:memory:`.
    pub fn try_new(connection_string: &str) -> Result<Self, DatabaseError> {
        let url = Self::build_sqlite_url(connection_string);
        let manager = SqliteManager::new(url.clone(), SqliteRuntime::Tokio1);
        let pool = SqlitePool::builder(manager)
            .max_size(SQLITE_POOL_SIZE)
            .build()
            .map_err(|e| DatabaseError::PoolCreation(e.to_string()))?;

        info!(
            "SQLite connection pool initialized (size: {}, path: {})",
            SQLITE_POOL_SIZE, url
        );

        Ok(Self { pool, url })
    }

    /// The resolved SQLite path or URI.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_sqlite_url(connection_string: &str) -> String {
        if let Some(path) = connection_string.strip_prefix("sqlite://") {
            path.to_string()
        } else {
            connection_string.to_string()
        }
    }

    /// Sets the connection pragmas and applies any pending embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        use diesel::prelude::*;
        use diesel_migrations::MigrationHarness;

        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let applied = conn
            .interact(|conn| -> Result<usize, String> {
                // WAL lets readers proceed while the single writer commits.
                diesel::sql_query("PRAGMA journal_mode=WAL;")
                    .execute(conn)
                    .map_err(|e| format!("failed to set WAL mode: {}", e))?;
                diesel::sql_query("PRAGMA busy_timeout=30000;")
                    .execute(conn)
                    .map_err(|e| format!("failed to set busy_timeout: {}", e))?;

                conn.run_pending_migrations(crate::database::MIGRATIONS)
                    .map(|versions| versions.len())
                    .map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?
            .map_err(DatabaseError::Migration)?;

        info!("Applied {} pending migration(s)", applied);
        Ok(())
    }

    /// Gets a pooled SQLite connection.
    pub async fn get_sqlite_connection(
        &self,
    ) -> Result<
        deadpool::managed::Object<SqliteManager>,
        deadpool::managed::PoolError<deadpool_diesel::Error>,
    > {
        self.pool.get().await
    }
}
