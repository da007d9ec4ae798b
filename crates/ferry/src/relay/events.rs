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

//! In-process event bus.
//!
//! The engine and the janitor publish lifecycle events here; transports
//! subscribe and translate them into their own framing. Publishing never
//! blocks and never fails: with no subscribers the event is dropped and the
//! request waits to be found through the pending listing.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::database::universal_types::UniversalTimestamp;
use crate::models::request::RequestStatus;

/// Lifecycle events, serialized with a `type` tag for push transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A request was admitted and is waiting for a worker.
    #[serde(rename = "new_request")]
    RequestAdmitted {
        category: String,
        identifier: String,
        dereference_url: String,
        created_at: UniversalTimestamp,
    },
    /// A request reached a terminal status.
    RequestCompleted {
        category: String,
        identifier: String,
        status: RequestStatus,
        worker_id: Option<String>,
    },
}

impl RelayEvent {
    pub fn identifier(&self) -> &str {
        match self {
            RelayEvent::RequestAdmitted { identifier, .. }
            | RelayEvent::RequestCompleted { identifier, .. } => identifier,
        }
    }
}

/// Fan-out channel for [`RelayEvent`]s.
#[derive(Debug, Clone)]
pub struct RelayEventBus {
    sender: broadcast::Sender<RelayEvent>,
}

impl RelayEventBus {
    /// Creates a bus that buffers up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event, returning how many subscribers will see it.
    pub fn publish(&self, event: RelayEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(identifier = %event.identifier(), "No subscribers for relay event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RelayEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
