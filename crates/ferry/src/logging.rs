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

//! Tracing subscriber bootstrap shared by the binaries and tests.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used, falling back to `info`.
/// Calling this more than once is harmless, later calls are ignored.
pub fn init_logging(level: Option<Level>) {
    install(level, false);
}

/// Same as [`init_logging`] but emits one JSON object per event.
pub fn init_json_logging(level: Option<Level>) {
    install(level, true);
}

fn install(level: Option<Level>, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(level.unwrap_or(Level::INFO).as_str().to_lowercase())
    });

    let result = if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
    };

    // A subscriber installed by an earlier call or a test harness stays in place.
    let _ = result;
}
