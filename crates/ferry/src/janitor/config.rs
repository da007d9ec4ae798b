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

use std::time::Duration;

/// Intervals and age thresholds for the janitor.
///
/// ```rust
/// use std::time::Duration;
/// use ferry::JanitorConfig;
///
/// let config = JanitorConfig::builder()
///     .request_timeout(Duration::from_secs(300))
///     .expire_after(Some(Duration::from_secs(120)))
///     .build();
/// assert_eq!(config.maintenance_interval(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct JanitorConfig {
    maintenance_interval: Duration,
    stale_lock_after: Duration,
    request_timeout: Duration,
    retention_interval: Duration,
    retention: Duration,
    expire_after: Option<Duration>,
}

/// Ages far beyond any realistic setting are clamped rather than overflowing.
fn to_age(value: Duration) -> chrono::Duration {
    chrono::Duration::from_std(value).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

impl JanitorConfig {
    pub fn builder() -> JanitorConfigBuilder {
        JanitorConfigBuilder::default()
    }

    /// How often stale-lock release and timeout escalation run.
    pub fn maintenance_interval(&self) -> Duration {
        self.maintenance_interval
    }

    /// Age after which a worker's claim is released.
    pub fn stale_lock_after(&self) -> Duration {
        self.stale_lock_after
    }

    /// Age after which an unfinished pending request times out.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retention_interval(&self) -> Duration {
        self.retention_interval
    }

    /// How long terminal requests are kept after completion.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Short-lived expiry for terminal requests, checked every maintenance
    /// cycle. Disabled when `None`.
    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after
    }

    pub(crate) fn stale_lock_age(&self) -> chrono::Duration {
        to_age(self.stale_lock_after)
    }

    pub(crate) fn request_timeout_age(&self) -> chrono::Duration {
        to_age(self.request_timeout)
    }

    pub(crate) fn retention_age(&self) -> chrono::Duration {
        to_age(self.retention)
    }

    pub(crate) fn expire_after_age(&self) -> Option<chrono::Duration> {
        self.expire_after.map(to_age)
    }
}

impl Default for JanitorConfig {
    fn default() -> Self {
        JanitorConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone)]
pub struct JanitorConfigBuilder {
    config: JanitorConfig,
}

impl Default for JanitorConfigBuilder {
    fn default() -> Self {
        Self {
            config: JanitorConfig {
                maintenance_interval: Duration::from_secs(60),
                stale_lock_after: Duration::from_secs(5 * 60),
                request_timeout: Duration::from_secs(10 * 60),
                retention_interval: Duration::from_secs(24 * 60 * 60),
                retention: Duration::from_secs(30 * 24 * 60 * 60),
                expire_after: None,
            },
        }
    }
}

impl JanitorConfigBuilder {
    pub fn maintenance_interval(mut self, value: Duration) -> Self {
        self.config.maintenance_interval = value;
        self
    }

    pub fn stale_lock_after(mut self, value: Duration) -> Self {
        self.config.stale_lock_after = value;
        self
    }

    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.config.request_timeout = value;
        self
    }

    pub fn retention_interval(mut self, value: Duration) -> Self {
        self.config.retention_interval = value;
        self
    }

    pub fn retention(mut self, value: Duration) -> Self {
        self.config.retention = value;
        self
    }

    pub fn expire_after(mut self, value: Option<Duration>) -> Self {
        self.config.expire_after = value;
        self
    }

    pub fn build(self) -> JanitorConfig {
        self.config
    }
}
