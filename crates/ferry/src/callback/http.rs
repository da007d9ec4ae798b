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

use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{CallbackDispatcher, CallbackPayload};

/// Retry and timeout settings for outbound callbacks.
///
/// ```rust
/// use std::time::Duration;
/// use ferry::callback::DispatcherConfig;
///
/// let config = DispatcherConfig::builder()
///     .max_retries(5)
///     .backoff(Duration::from_secs(1))
///     .build();
/// assert_eq!(config.max_retries(), 5);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DispatcherConfig {
    request_timeout: Duration,
    backoff: Duration,
    max_retries: u32,
}

impl DispatcherConfig {
    pub fn builder() -> DispatcherConfigBuilder {
        DispatcherConfigBuilder::default()
    }

    /// Per-attempt HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fixed pause between attempts.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Attempts made after the first one fails.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfigBuilder {
    config: DispatcherConfig,
}

impl Default for DispatcherConfigBuilder {
    fn default() -> Self {
        Self {
            config: DispatcherConfig {
                request_timeout: Duration::from_secs(5),
                backoff: Duration::from_secs(2),
                max_retries: 3,
            },
        }
    }
}

impl DispatcherConfigBuilder {
    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.config.request_timeout = value;
        self
    }

    pub fn backoff(mut self, value: Duration) -> Self {
        self.config.backoff = value;
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.config.max_retries = value;
        self
    }

    pub fn build(self) -> DispatcherConfig {
        self.config
    }
}

/// Delivers callbacks as JSON `POST`s.
///
/// Any 2xx response counts as delivered. Transport errors and non-2xx
/// responses are retried after a fixed backoff, up to `max_retries` times.
#[derive(Debug, Clone)]
pub struct HttpCallbackDispatcher {
    client: reqwest::Client,
    config: DispatcherConfig,
}

impl HttpCallbackDispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

#[async_trait]
impl CallbackDispatcher for HttpCallbackDispatcher {
    async fn deliver(&self, address: &str, payload: &CallbackPayload) -> bool {
        let attempts = self.config.max_retries + 1;

        for attempt in 1..=attempts {
            match self.client.post(address).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        category = %payload.category,
                        identifier = %payload.identifier,
                        status = %payload.status,
                        attempt,
                        "Callback delivered to {}",
                        address
                    );
                    return true;
                }
                Ok(response) => {
                    warn!(
                        identifier = %payload.identifier,
                        attempt,
                        http_status = %response.status(),
                        "Callback to {} rejected",
                        address
                    );
                }
                Err(e) => {
                    warn!(
                        identifier = %payload.identifier,
                        attempt,
                        "Callback to {} failed: {}",
                        address,
                        e
                    );
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.backoff).await;
            }
        }

        error!(
            category = %payload.category,
            identifier = %payload.identifier,
            attempts,
            "Giving up on callback to {}",
            address
        );
        false
    }
}
