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

//! Ferry relay server.
//!
//! Exposes a [`ferry::RelayEngine`] over HTTP for originators and workers,
//! and over a WebSocket for workers that want pushed events.

pub mod allow_list;
pub mod config;
pub mod http;
pub mod server;

pub use allow_list::OriginAllowList;
pub use config::{ConfigLoader, FerryConfig};
pub use http::{router, AppState};
pub use server::{serve, shutdown_signal};
