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

//! Implementation of the `admin pending` command.
//!
//! Prints one line per pending request: category, identifier, creation time
//! and the payload as compact JSON.

use anyhow::{Context, Result};
use tracing::info;

use super::open;

pub async fn run(database_url: &str) -> Result<()> {
    let dal = open(database_url).await?;

    let pending = dal
        .requests()
        .list_pending()
        .await
        .context("Failed to list pending requests")?;

    for request in &pending {
        let payload = request
            .payload
            .as_ref()
            .map(serde_json::Value::to_string)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}",
            request.category, request.identifier, request.created_at, payload
        );
    }

    info!("{} pending request(s)", pending.len());
    Ok(())
}
