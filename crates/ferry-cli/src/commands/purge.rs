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

//! Implementation of the `admin purge` command.
//!
//! Deletes terminal requests completed before the cutoff. Pending and
//! claimed requests are never touched, whatever their age.

use anyhow::{Context, Result};
use ferry::{UniversalTimestamp, DAL};
use tracing::info;

use super::duration::cutoff;
use super::{open, target_categories};

/// Run the purge command.
///
/// # Arguments
///
/// * `database_url` - The database connection URL
/// * `older_than` - Duration string (e.g., "30d", "24h")
/// * `category` - Restrict the purge to one category
/// * `dry_run` - If true, only report what would be deleted
pub async fn run(
    database_url: &str,
    older_than: &str,
    category: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let cutoff = cutoff(older_than)?;
    info!(
        "Purging requests completed before {} (older than {})",
        cutoff, older_than
    );

    let dal = open(database_url).await?;
    let total = purge(&dal, cutoff, category, dry_run).await?;

    if total == 0 {
        info!("No requests completed before {}", cutoff);
    } else if dry_run {
        info!("[DRY RUN] Would delete {} request(s)", total);
    } else {
        info!("Deleted {} request(s)", total);
    }

    Ok(())
}

/// Purges (or counts, for a dry run) per category and returns the total.
async fn purge(
    dal: &DAL,
    cutoff: UniversalTimestamp,
    category: Option<&str>,
    dry_run: bool,
) -> Result<usize> {
    let mut total = 0;

    for category in target_categories(dal, category).await? {
        let affected = if dry_run {
            let count = dal
                .requests()
                .count_purgeable(&category, cutoff)
                .await
                .with_context(|| format!("Failed to count requests in {}", category))?;
            usize::try_from(count).unwrap_or_default()
        } else {
            dal.requests()
                .purge(&category, cutoff)
                .await
                .with_context(|| format!("Failed to purge requests in {}", category))?
        };

        if affected > 0 {
            info!(category = %category, affected, dry_run, "Purge");
        }
        total += affected;
    }

    Ok(total)
}
