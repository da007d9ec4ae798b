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

//! # Ferry
//!
//! Ferry is a brokered request relay. Originators submit work requests into a
//! category, workers discover them (by subscribing to the event bus or by
//! polling the pending listing), and the first terminal report a worker makes
//! is forwarded back to the originator's callback address.
//!
//! ## Components
//!
//! - [`dal`]: the durable Request Store and the per-category Identifier
//!   Allocator, backed by SQLite through diesel and deadpool.
//! - [`relay`]: the [`RelayEngine`] that owns the request lifecycle and the
//!   [`RelayEventBus`] transports subscribe to.
//! - [`callback`]: outbound result delivery with bounded retry.
//! - [`janitor`]: periodic stale-lock release, timeout escalation and
//!   retention purge.
//!
//! All correctness-critical transitions are single conditional statements
//! guarded by the current status, so the HTTP handlers, WebSocket handlers and
//! the janitor may run concurrently without any in-process lock.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ferry::{
//!     Database, DAL, RelayEngine, RelayConfig, SystemClock,
//!     callback::{DeliveryPool, HttpCallbackDispatcher, DispatcherConfig},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let database = Database::try_new("ferry.db")?;
//! database.run_migrations().await?;
//!
//! let dal = DAL::new(database);
//! let dispatcher = HttpCallbackDispatcher::new(DispatcherConfig::default())?;
//! let deliveries = DeliveryPool::new(Arc::new(dispatcher));
//! let engine = RelayEngine::new(dal, deliveries, Arc::new(SystemClock), RelayConfig::default());
//!
//! let admission = engine
//!     .submit("connectioncheck", "http://originator.local/cb", None)
//!     .await?;
//! println!("admitted {}", admission.identifier);
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod clock;
pub mod dal;
pub mod database;
pub mod error;
pub mod janitor;
pub mod logging;
pub mod models;
pub mod relay;

pub use callback::{
    CallbackDispatcher, CallbackPayload, DeliveryPool, DispatcherConfig, HttpCallbackDispatcher,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dal::DAL;
pub use database::connection::Database;
pub use database::universal_types::UniversalTimestamp;
pub use error::{RelayError, StoreError};
pub use janitor::{Janitor, JanitorConfig, JanitorHandle, MaintenanceReport, RetentionReport};
pub use logging::{init_json_logging, init_logging};
pub use models::request::{PendingRequest, Request, RequestResult, RequestStatus};
pub use relay::events::{RelayEvent, RelayEventBus};
pub use relay::{Admission, RelayConfig, RelayEngine};
