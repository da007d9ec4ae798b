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

use crate::config::{types::*, ConfigValidationError};
use std::net::SocketAddr;

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigValidationError>;
}

impl Validate for FerryConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.database.validate() {
            errors.push(e);
        }
        if let Err(e) = self.server.validate() {
            errors.push(e);
        }
        if let Err(e) = self.relay.validate() {
            errors.push(e);
        }
        if let Err(e) = self.janitor.validate() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigValidationError::Multiple { errors }),
        }
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        let path = self.url.strip_prefix("sqlite://").unwrap_or(&self.url);
        if path.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDatabaseUrl);
        }
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.bind_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigValidationError::InvalidBindAddress {
                address: self.bind_address.clone(),
            });
        }

        if !url_scheme_is_http(&self.public_url) {
            return Err(ConfigValidationError::InvalidPublicUrl {
                url: self.public_url.clone(),
            });
        }

        Ok(())
    }
}

impl Validate for RelaySettings {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.callback_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroInterval {
                field: "relay.callback_timeout_secs",
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigValidationError::ZeroInterval {
                field: "relay.event_capacity",
            });
        }
        if let Some(name) = self
            .categories
            .iter()
            .find(|name| name.trim().is_empty() || name.contains('/'))
        {
            return Err(ConfigValidationError::InvalidCategory { name: name.clone() });
        }
        Ok(())
    }
}

impl Validate for JanitorSettings {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        let intervals = [
            ("janitor.maintenance_interval_secs", self.maintenance_interval_secs),
            ("janitor.stale_lock_secs", self.stale_lock_secs),
            ("janitor.request_timeout_secs", self.request_timeout_secs),
            ("janitor.retention_interval_secs", self.retention_interval_secs),
            ("janitor.retention_days", self.retention_days),
        ];

        if let Some((field, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroInterval { field: *field });
        }
        if self.expire_after_secs == Some(0) {
            return Err(ConfigValidationError::ZeroInterval {
                field: "janitor.expire_after_secs",
            });
        }
        Ok(())
    }
}

fn url_scheme_is_http(value: &str) -> bool {
    (value.starts_with("http://") || value.starts_with("https://"))
        && value.split("://").nth(1).is_some_and(|rest| !rest.is_empty())
}
