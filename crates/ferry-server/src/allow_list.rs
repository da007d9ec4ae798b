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

//! Cross-origin allow-list.
//!
//! The CORS layer asks [`OriginAllowList::allows`] on every request carrying
//! an `Origin` header, so replacing the list takes effect immediately without
//! rebuilding the router. Each replacement bumps a version number that can be
//! logged or compared by callers.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

const ANY_ORIGIN: &str = "*";

#[derive(Debug, Default)]
struct AllowListState {
    version: u64,
    origins: BTreeSet<String>,
}

/// Shared, versioned set of allowed origins. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    state: Arc<RwLock<AllowListState>>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(RwLock::new(AllowListState {
                version: 1,
                origins: normalise(origins),
            })),
        }
    }

    /// Whether `origin` may make cross-origin requests.
    pub fn allows(&self, origin: &str) -> bool {
        let state = self.state.read();
        state.origins.contains(ANY_ORIGIN)
            || state.origins.contains(origin.trim_end_matches('/'))
    }

    /// Replaces the whole list and returns the new version.
    pub fn replace<I, S>(&self, origins: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins = normalise(origins);
        let mut state = self.state.write();
        state.version += 1;
        state.origins = origins;
        info!(version = state.version, origins = state.origins.len(), "Origin allow-list replaced");
        state.version
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Current origins in sorted order.
    pub fn origins(&self) -> Vec<String> {
        self.state.read().origins.iter().cloned().collect()
    }
}

fn normalise<I, S>(origins: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    origins
        .into_iter()
        .map(Into::into)
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
