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

//! Callback delivery.
//!
//! When a request reaches a terminal status the originator is told at its
//! callback address. Delivery is at-least-once with a bounded number of
//! attempts; a delivery that gives up is logged and nothing else happens. The
//! request's stored status is already final by the time a callback is sent
//! and is never rolled back.
//!
//! - [`CallbackDispatcher`] is the seam: one delivery sequence per call.
//! - [`HttpCallbackDispatcher`] is the production implementation.
//! - [`DeliveryPool`] runs delivery sequences in the background so that the
//!   engine and the janitor never wait out a retry window.

mod http;

pub use http::{DispatcherConfig, DispatcherConfigBuilder, HttpCallbackDispatcher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::models::request::{Request, RequestStatus};

/// Body POSTed to the originator's callback address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub category: String,
    pub identifier: String,
    pub status: RequestStatus,
    /// `None` for timeouts.
    pub worker_id: Option<String>,
}

impl CallbackPayload {
    /// Builds the payload for a request that just reached `status`.
    pub fn for_request(request: &Request, status: RequestStatus) -> Self {
        let worker_id = match status {
            RequestStatus::Timeout => None,
            _ => request.locked_by.clone(),
        };

        Self {
            category: request.category.clone(),
            identifier: request.identifier.clone(),
            status,
            worker_id,
        }
    }
}

/// Delivers one terminal result to an originator.
#[async_trait]
pub trait CallbackDispatcher: Send + Sync {
    /// Runs a full delivery sequence (first attempt plus retries) and reports
    /// whether any attempt succeeded. Must not panic on delivery failure.
    async fn deliver(&self, address: &str, payload: &CallbackPayload) -> bool;
}

/// Background runner for delivery sequences.
///
/// Clones share the same dispatcher and the same set of in-flight deliveries.
#[derive(Clone)]
pub struct DeliveryPool {
    dispatcher: Arc<dyn CallbackDispatcher>,
    in_flight: Arc<Mutex<JoinSet<bool>>>,
}

impl DeliveryPool {
    pub fn new(dispatcher: Arc<dyn CallbackDispatcher>) -> Self {
        Self {
            dispatcher,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Starts a delivery sequence and returns immediately.
    pub async fn enqueue(&self, address: String, payload: CallbackPayload) {
        let dispatcher = self.dispatcher.clone();
        let mut in_flight = self.in_flight.lock().await;

        // Reap finished sequences so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}

        debug!(
            category = %payload.category,
            identifier = %payload.identifier,
            status = %payload.status,
            "Queued callback delivery"
        );

        in_flight.spawn(async move { dispatcher.deliver(&address, &payload).await });
    }

    /// Number of sequences that have not been reaped yet.
    pub async fn pending(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Waits for every delivery sequence started so far.
    ///
    /// Returns how many sequences were awaited. Deliveries enqueued while
    /// draining are left running.
    pub async fn drain(&self) -> usize {
        let mut draining = {
            let mut in_flight = self.in_flight.lock().await;
            std::mem::take(&mut *in_flight)
        };

        let mut awaited = 0;
        while let Some(result) = draining.join_next().await {
            awaited += 1;
            if let Err(e) = result {
                error!("Callback delivery task aborted: {}", e);
            }
        }
        awaited
    }
}
