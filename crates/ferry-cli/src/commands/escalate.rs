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

//! Implementation of the `admin escalate` command.
//!
//! Marks unclaimed requests created before the cutoff as `timeout` and sends
//! each originator its `timeout` callback, the same way the janitor inside a
//! running server does. The command exits once every delivery sequence has
//! finished. The affected requests are printed one per line.

use anyhow::{Context, Result};
use ferry::{
    CallbackPayload, DeliveryPool, DispatcherConfig, HttpCallbackDispatcher, Request,
    RequestStatus, UniversalTimestamp, DAL,
};
use std::sync::Arc;
use tracing::info;

use super::duration::cutoff;
use super::{open, target_categories};

pub async fn run(database_url: &str, older_than: &str, callbacks: DispatcherConfig) -> Result<()> {
    let cutoff = cutoff(older_than)?;
    let dal = open(database_url).await?;

    let dispatcher =
        HttpCallbackDispatcher::new(callbacks).context("Failed to build the callback HTTP client")?;
    let deliveries = DeliveryPool::new(Arc::new(dispatcher));

    let escalated = escalate(&dal, cutoff, &deliveries).await?;
    for request in &escalated {
        println!(
            "{}\t{}\t{}",
            request.category, request.identifier, request.callback_url
        );
    }

    info!(
        "Timed out {} request(s) created before {}",
        escalated.len(),
        cutoff
    );

    let awaited = deliveries.drain().await;
    info!("Finished {} timeout callback(s)", awaited);
    Ok(())
}

/// Escalates every category and queues one `timeout` callback per request.
async fn escalate(
    dal: &DAL,
    cutoff: UniversalTimestamp,
    deliveries: &DeliveryPool,
) -> Result<Vec<Request>> {
    let now = UniversalTimestamp::now();
    let mut escalated = Vec::new();

    for category in target_categories(dal, None).await? {
        let expired = dal
            .requests()
            .escalate_timeouts(&category, cutoff, now)
            .await
            .with_context(|| format!("Failed to escalate requests in {}", category))?;

        for request in &expired {
            deliveries
                .enqueue(
                    request.callback_url.clone(),
                    CallbackPayload::for_request(request, RequestStatus::Timeout),
                )
                .await;
        }
        escalated.extend(expired);
    }

    Ok(escalated)
}
