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

//! Implementation of the `admin provision` command.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use super::open;

pub async fn run(database_url: &str, categories: &[String]) -> Result<()> {
    let dal = open(database_url).await?;

    for category in categories {
        let category = category.trim();
        if category.is_empty() {
            return Err(anyhow!("Category names cannot be empty"));
        }

        let created = dal
            .counters()
            .provision(category)
            .await
            .with_context(|| format!("Failed to provision {}", category))?;

        if created {
            info!("Provisioned category {}", category);
        } else {
            info!("Category {} already exists", category);
        }
    }

    Ok(())
}
