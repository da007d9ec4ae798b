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

//! Relay Engine
//!
//! The engine owns the request lifecycle. Transports call it; it calls the
//! Request Store, publishes on the [`RelayEventBus`] and hands terminal
//! results to the [`DeliveryPool`]. It keeps no request state in memory
//! between calls.
//!
//! Workers can learn about new requests two ways, and both are always live:
//! push subscribers receive a `new_request` event on admission, and polling
//! workers see the request in [`RelayEngine::list_pending`].
//!
//! Duplicate and late reports are expected. [`RelayEngine::report_result`]
//! answers them with `false` and has no other effect, so workers and
//! transports may retry freely.

pub mod config;
pub mod events;

pub use config::{RelayConfig, RelayConfigBuilder};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::callback::{CallbackPayload, DeliveryPool};
use crate::clock::Clock;
use crate::dal::DAL;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::RelayError;
use crate::models::request::{PendingRequest, Request, RequestResult, RequestStatus};
use events::{RelayEvent, RelayEventBus};

/// What an originator gets back when a request is admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub category: String,
    pub identifier: String,
    pub dereference_url: String,
    pub created_at: UniversalTimestamp,
}

/// Orchestrates admission, claiming and completion of requests.
///
/// Cloning is cheap; clones share the pool, the bus and the delivery pool.
#[derive(Clone)]
pub struct RelayEngine {
    dal: DAL,
    events: RelayEventBus,
    deliveries: DeliveryPool,
    clock: Arc<dyn Clock>,
    config: RelayConfig,
}

impl RelayEngine {
    pub fn new(
        dal: DAL,
        deliveries: DeliveryPool,
        clock: Arc<dyn Clock>,
        config: RelayConfig,
    ) -> Self {
        let events = RelayEventBus::new(config.event_capacity());
        Self {
            dal,
            events,
            deliveries,
            clock,
            config,
        }
    }

    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    pub fn events(&self) -> &RelayEventBus {
        &self.events
    }

    pub fn deliveries(&self) -> &DeliveryPool {
        &self.deliveries
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Link a worker follows to fetch the full request.
    pub fn dereference_url(&self, category: &str, identifier: &str) -> String {
        format!(
            "{}/api/request/{}/{}",
            self.config.public_url(),
            category,
            identifier
        )
    }

    /// Admits a request and announces it to push subscribers.
    ///
    /// Fails with [`RelayError::Validation`] before touching storage when the
    /// category or callback address is missing, or the address is not an
    /// absolute http(s) URL.
    pub async fn submit(
        &self,
        category: &str,
        callback_url: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<Admission, RelayError> {
        let category = category.trim();
        let callback_url = callback_url.trim();

        if category.is_empty() {
            return Err(RelayError::Validation("category is required".to_string()));
        }
        validate_callback_url(callback_url)?;

        let request = self
            .dal
            .requests()
            .create(category, callback_url, payload, self.clock.now())
            .await?;

        let admission = Admission {
            dereference_url: self.dereference_url(&request.category, &request.identifier),
            category: request.category,
            identifier: request.identifier,
            created_at: request.created_at,
        };

        let notified = self.events.publish(RelayEvent::RequestAdmitted {
            category: admission.category.clone(),
            identifier: admission.identifier.clone(),
            dereference_url: admission.dereference_url.clone(),
            created_at: admission.created_at,
        });

        info!(
            category = %admission.category,
            identifier = %admission.identifier,
            subscribers = notified,
            "Request admitted"
        );

        Ok(admission)
    }

    /// Records a worker's terminal report.
    ///
    /// The first report for a request wins, regardless of which worker makes
    /// it or whether that worker claimed the request. Returns `false` for
    /// duplicate, late or unknown reports. An accepted report publishes
    /// `request_completed` and starts the originator callback in the
    /// background.
    pub async fn report_result(
        &self,
        category: &str,
        identifier: &str,
        status: RequestStatus,
        worker_id: &str,
    ) -> Result<bool, RelayError> {
        let completed = self
            .dal
            .requests()
            .complete(category, identifier, status, worker_id, self.clock.now())
            .await?;

        let Some(request) = completed else {
            warn!(
                category = %category,
                identifier = %identifier,
                status = %status,
                worker_id = %worker_id,
                "Ignoring report for a terminal or unknown request"
            );
            return Ok(false);
        };

        info!(
            category = %category,
            identifier = %identifier,
            status = %status,
            worker_id = %worker_id,
            "Request completed"
        );

        self.events.publish(RelayEvent::RequestCompleted {
            category: request.category.clone(),
            identifier: request.identifier.clone(),
            status,
            worker_id: request.locked_by.clone(),
        });

        self.deliveries
            .enqueue(
                request.callback_url.clone(),
                CallbackPayload::for_request(&request, status),
            )
            .await;

        Ok(true)
    }

    /// Claims a pending request for `worker_id`.
    ///
    /// Returns `false` when someone else holds it or it is no longer pending.
    pub async fn claim(
        &self,
        category: &str,
        identifier: &str,
        worker_id: &str,
    ) -> Result<bool, RelayError> {
        let locked = self
            .dal
            .requests()
            .lock(category, identifier, worker_id, self.clock.now())
            .await?;

        if locked {
            debug!(category = %category, identifier = %identifier, worker_id = %worker_id, "Request claimed");
        } else {
            debug!(category = %category, identifier = %identifier, worker_id = %worker_id, "Claim refused");
        }

        Ok(locked)
    }

    pub async fn get(&self, category: &str, identifier: &str) -> Result<Option<Request>, RelayError> {
        Ok(self.dal.requests().get(category, identifier).await?)
    }

    pub async fn get_result(
        &self,
        category: &str,
        identifier: &str,
    ) -> Result<Option<RequestResult>, RelayError> {
        Ok(self.get(category, identifier).await?.map(|r| r.result()))
    }

    /// Pending requests across all categories, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<PendingRequest>, RelayError> {
        let pending = self.dal.requests().list_pending().await?;

        Ok(pending
            .into_iter()
            .map(|request| PendingRequest {
                dereference_url: self.dereference_url(&request.category, &request.identifier),
                category: request.category,
                identifier: request.identifier,
                created_at: request.created_at,
                payload: request.payload,
            })
            .collect())
    }
}

fn validate_callback_url(callback_url: &str) -> Result<(), RelayError> {
    if callback_url.is_empty() {
        return Err(RelayError::Validation(
            "callback_url is required".to_string(),
        ));
    }

    let parsed = Url::parse(callback_url).map_err(|e| {
        RelayError::Validation(format!("callback_url '{}' is invalid: {}", callback_url, e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RelayError::Validation(format!(
            "callback_url scheme '{}' is not supported",
            other
        ))),
    }
}
