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

pub mod duration;
pub mod escalate;
pub mod pending;
pub mod provision;
pub mod purge;
pub mod release_locks;

use anyhow::{Context, Result};
use ferry::{Database, DAL};

/// Opens the store and brings its schema up to date.
pub async fn open(database_url: &str) -> Result<DAL> {
    let database = Database::try_new(database_url).context("Failed to connect to database")?;
    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;
    Ok(DAL::new(database))
}

/// The categories a command applies to: the one named, or every provisioned one.
pub async fn target_categories(dal: &DAL, category: Option<&str>) -> Result<Vec<String>> {
    match category {
        Some(category) => Ok(vec![category.to_string()]),
        None => dal
            .counters()
            .list_categories()
            .await
            .context("Failed to list categories"),
    }
}
