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

use ferry::{DispatcherConfig, JanitorConfig, RelayConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level server configuration. Every section and field is optional in
/// the file; missing values take the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub relay: RelaySettings,
    pub janitor: JanitorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path or `sqlite://` URL.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Base URL workers use to reach this server; dereference links are
    /// built from it.
    pub public_url: String,
    /// Origins allowed by CORS. `*` allows any origin.
    pub allowed_origins: Vec<String>,
    pub json_logs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Categories provisioned at startup, in addition to those already in
    /// the store.
    pub categories: Vec<String>,
    pub callback_timeout_secs: u64,
    pub callback_backoff_secs: u64,
    pub callback_max_retries: u32,
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorSettings {
    pub maintenance_interval_secs: u64,
    pub stale_lock_secs: u64,
    pub request_timeout_secs: u64,
    pub retention_interval_secs: u64,
    pub retention_days: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "ferry.db".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            public_url: "http://127.0.0.1:5000".to_string(),
            allowed_origins: vec!["http://localhost:5001".to_string()],
            json_logs: false,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            categories: vec![
                "logincheckrequest".to_string(),
                "connectioncheck".to_string(),
            ],
            callback_timeout_secs: 5,
            callback_backoff_secs: 2,
            callback_max_retries: 3,
            event_capacity: 256,
        }
    }
}

impl Default for JanitorSettings {
    fn default() -> Self {
        Self {
            maintenance_interval_secs: 60,
            stale_lock_secs: 5 * 60,
            request_timeout_secs: 10 * 60,
            retention_interval_secs: 24 * 60 * 60,
            retention_days: 30,
            expire_after_secs: None,
        }
    }
}

impl FerryConfig {
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::builder()
            .public_url(self.server.public_url.clone())
            .event_capacity(self.relay.event_capacity)
            .build()
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::builder()
            .request_timeout(Duration::from_secs(self.relay.callback_timeout_secs))
            .backoff(Duration::from_secs(self.relay.callback_backoff_secs))
            .max_retries(self.relay.callback_max_retries)
            .build()
    }

    pub fn janitor_config(&self) -> JanitorConfig {
        let janitor = &self.janitor;
        JanitorConfig::builder()
            .maintenance_interval(Duration::from_secs(janitor.maintenance_interval_secs))
            .stale_lock_after(Duration::from_secs(janitor.stale_lock_secs))
            .request_timeout(Duration::from_secs(janitor.request_timeout_secs))
            .retention_interval(Duration::from_secs(janitor.retention_interval_secs))
            .retention(Duration::from_secs(
                janitor.retention_days.saturating_mul(24 * 60 * 60),
            ))
            .expire_after(janitor.expire_after_secs.map(Duration::from_secs))
            .build()
    }
}
