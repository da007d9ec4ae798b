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

//! Janitor
//!
//! Two independent periodic jobs keep the Request Store moving:
//!
//! - **Maintenance** (default every 60s): release locks older than the stale
//!   threshold, then time out pending requests older than the request timeout
//!   and queue a `timeout` callback for each. When short-lived expiry is
//!   configured, terminal requests older than that are also deleted here.
//! - **Retention** (default every 24h): purge terminal requests completed
//!   more than the retention age ago.
//!
//! Each job body is a public method ([`Janitor::run_maintenance_cycle`],
//! [`Janitor::run_retention_cycle`]) driven by the janitor's [`Clock`], so it
//! can be invoked directly. [`Janitor::start`] wraps both in interval loops.
//!
//! Every predicate is an age/status filter over the store, so a skipped
//! cycle loses nothing: the next one picks the same rows up. Shutdown never
//! interrupts a running cycle, because rows it has already moved to
//! `timeout` would not be found again.
//! Timeouts are only detected when a cycle runs, so a request can stay
//! pending for up to one maintenance interval past the timeout.
//!
//! Categories are processed one at a time and a failure in one is logged and
//! reported without stopping the others.

mod config;

pub use config::{JanitorConfig, JanitorConfigBuilder};

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::callback::{CallbackPayload, DeliveryPool};
use crate::clock::Clock;
use crate::dal::DAL;
use crate::error::StoreError;
use crate::models::request::RequestStatus;
use crate::relay::events::{RelayEvent, RelayEventBus};
use crate::relay::RelayEngine;

/// `tokio::time::interval` rejects a zero period.
const MIN_PERIOD: std::time::Duration = std::time::Duration::from_millis(10);

/// Outcome of one maintenance cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub released: usize,
    pub timed_out: usize,
    pub expired: usize,
    /// Categories where at least one step failed.
    pub failed_categories: Vec<String>,
}

/// Outcome of one retention cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub purged: usize,
    pub failed_categories: Vec<String>,
}

/// Periodic maintenance over the Request Store.
#[derive(Clone)]
pub struct Janitor {
    dal: DAL,
    events: RelayEventBus,
    deliveries: DeliveryPool,
    clock: Arc<dyn Clock>,
    config: JanitorConfig,
}

impl Janitor {
    pub fn new(
        dal: DAL,
        events: RelayEventBus,
        deliveries: DeliveryPool,
        clock: Arc<dyn Clock>,
        config: JanitorConfig,
    ) -> Self {
        Self {
            dal,
            events,
            deliveries,
            clock,
            config,
        }
    }

    /// Builds a janitor sharing the engine's store, bus, delivery pool and clock.
    pub fn for_engine(engine: &RelayEngine, config: JanitorConfig) -> Self {
        Self::new(
            engine.dal().clone(),
            engine.events().clone(),
            engine.deliveries().clone(),
            engine.clock(),
            config,
        )
    }

    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Stale-lock release, timeout escalation and, if configured, short-lived
    /// expiry for every provisioned category.
    ///
    /// Only fails when the category list itself cannot be read.
    pub async fn run_maintenance_cycle(&self) -> Result<MaintenanceReport, StoreError> {
        let now = self.clock.now();
        let stale_cutoff = now.minus(self.config.stale_lock_age());
        let timeout_cutoff = now.minus(self.config.request_timeout_age());
        let expiry_cutoff = self.config.expire_after_age().map(|age| now.minus(age));

        let mut report = MaintenanceReport::default();
        let requests = self.dal.requests();

        for category in self.dal.counters().list_categories().await? {
            let mut failed = false;

            match requests.release_stale_locks(&category, stale_cutoff).await {
                Ok(0) => {}
                Ok(released) => {
                    info!(category = %category, released, "Released stale locks");
                    report.released += released;
                }
                Err(e) => {
                    error!(category = %category, "Stale lock release failed: {}", e);
                    failed = true;
                }
            }

            match requests
                .escalate_timeouts(&category, timeout_cutoff, now)
                .await
            {
                Ok(expired) => {
                    if !expired.is_empty() {
                        info!(category = %category, count = expired.len(), "Timed out pending requests");
                    }
                    report.timed_out += expired.len();

                    for request in expired {
                        self.events.publish(RelayEvent::RequestCompleted {
                            category: request.category.clone(),
                            identifier: request.identifier.clone(),
                            status: RequestStatus::Timeout,
                            worker_id: None,
                        });
                        self.deliveries
                            .enqueue(
                                request.callback_url.clone(),
                                CallbackPayload::for_request(&request, RequestStatus::Timeout),
                            )
                            .await;
                    }
                }
                Err(e) => {
                    error!(category = %category, "Timeout escalation failed: {}", e);
                    failed = true;
                }
            }

            if let Some(cutoff) = expiry_cutoff {
                match requests.purge(&category, cutoff).await {
                    Ok(0) => {}
                    Ok(expired) => {
                        debug!(category = %category, expired, "Expired short-lived requests");
                        report.expired += expired;
                    }
                    Err(e) => {
                        error!(category = %category, "Short-lived expiry failed: {}", e);
                        failed = true;
                    }
                }
            }

            if failed {
                report.failed_categories.push(category);
            }
        }

        Ok(report)
    }

    /// Purges terminal requests past the retention age in every category.
    pub async fn run_retention_cycle(&self) -> Result<RetentionReport, StoreError> {
        let cutoff = self.clock.now().minus(self.config.retention_age());
        let mut report = RetentionReport::default();
        let requests = self.dal.requests();

        for category in self.dal.counters().list_categories().await? {
            match requests.purge(&category, cutoff).await {
                Ok(purged) => {
                    if purged > 0 {
                        info!(category = %category, purged, "Purged completed requests");
                    }
                    report.purged += purged;
                }
                Err(e) => {
                    error!(category = %category, "Retention purge failed: {}", e);
                    report.failed_categories.push(category);
                }
            }
        }

        Ok(report)
    }

    /// Runs maintenance cycles until shutdown is signalled.
    ///
    /// Shutdown is only observed between cycles. A cycle that has started
    /// always publishes and enqueues the callbacks for what it timed out.
    async fn run_maintenance_loop(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let period = self.config.maintenance_interval().max(MIN_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.recv() => {
                    info!("Janitor maintenance shutdown requested");
                    break;
                }
            }

            match self.run_maintenance_cycle().await {
                Ok(report) if !report.failed_categories.is_empty() => {
                    warn!(failed = ?report.failed_categories, "Maintenance cycle finished with failures");
                }
                Ok(report) => debug!(?report, "Maintenance cycle finished"),
                Err(e) => error!("Maintenance cycle failed: {}", e),
            }
        }
    }

    async fn run_retention_loop(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let period = self.config.retention_interval().max(MIN_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.recv() => {
                    info!("Janitor retention shutdown requested");
                    break;
                }
            }

            match self.run_retention_cycle().await {
                Ok(report) => debug!(?report, "Retention cycle finished"),
                Err(e) => error!("Retention cycle failed: {}", e),
            }
        }
    }

    /// Spawns both periodic jobs. The first run of each happens one interval
    /// after start.
    pub fn start(self) -> JanitorHandle {
        info!(
            maintenance_interval = ?self.config.maintenance_interval(),
            retention_interval = ?self.config.retention_interval(),
            "Starting janitor"
        );

        let (shutdown_tx, maintenance_shutdown_rx) = broadcast::channel(1);
        let retention_shutdown_rx = shutdown_tx.subscribe();

        let janitor = self.clone();
        let maintenance_handle = tokio::spawn(async move {
            janitor.run_maintenance_loop(maintenance_shutdown_rx).await;
        });

        let janitor = self;
        let retention_handle = tokio::spawn(async move {
            janitor.run_retention_loop(retention_shutdown_rx).await;
        });

        JanitorHandle {
            shutdown_tx,
            handles: vec![maintenance_handle, retention_handle],
        }
    }
}

/// Handle to a running janitor.
pub struct JanitorHandle {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl JanitorHandle {
    /// Stops both jobs and waits for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Janitor task ended abnormally: {}", e);
            }
        }
    }
}
