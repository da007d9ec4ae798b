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

//! Configuration for the [`RelayEngine`](super::RelayEngine).

/// Engine settings.
///
/// ```rust
/// use ferry::RelayConfig;
///
/// let config = RelayConfig::builder()
///     .public_url("https://relay.example.net/")
///     .build();
/// assert_eq!(config.public_url(), "https://relay.example.net");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct RelayConfig {
    public_url: String,
    event_capacity: usize,
}

impl RelayConfig {
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Base URL workers use to reach this relay, without a trailing slash.
    /// Dereference URLs are built from it.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Events buffered per subscriber before a slow one starts missing them.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl Default for RelayConfigBuilder {
    fn default() -> Self {
        Self {
            config: RelayConfig {
                public_url: "http://127.0.0.1:5000".to_string(),
                event_capacity: 256,
            },
        }
    }
}

impl RelayConfigBuilder {
    pub fn public_url(mut self, value: impl Into<String>) -> Self {
        self.config.public_url = value.into().trim_end_matches('/').to_string();
        self
    }

    pub fn event_capacity(mut self, value: usize) -> Self {
        self.config.event_capacity = value;
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}
