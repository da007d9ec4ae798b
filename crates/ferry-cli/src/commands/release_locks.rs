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

//! Implementation of the `admin release-locks` command.

use anyhow::{Context, Result};
use tracing::info;

use super::duration::cutoff;
use super::{open, target_categories};

pub async fn run(database_url: &str, older_than: &str) -> Result<()> {
    let cutoff = cutoff(older_than)?;
    let dal = open(database_url).await?;

    let mut total = 0;
    for category in target_categories(&dal, None).await? {
        let released = dal
            .requests()
            .release_stale_locks(&category, cutoff)
            .await
            .with_context(|| format!("Failed to release locks in {}", category))?;
        if released > 0 {
            info!(category = %category, released, "Released stale locks");
        }
        total += released;
    }

    info!("Released {} lock(s) taken before {}", total, cutoff);
    Ok(())
}
