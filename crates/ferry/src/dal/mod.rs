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

//! Data Access Layer
//!
//! The DAL is the only code that talks to SQLite. It is split per entity:
//!
//! - [`CounterDAL`]: the Identifier Allocator (per-category counters)
//! - [`RequestDAL`]: the Request Store
//!
//! Every mutation that decides a race (`complete`, `lock`,
//! `escalate_timeouts`) is a single statement guarded by the current status,
//! so concurrent writers never need an application-level lock.

pub mod counter;
pub mod models;
pub mod request;

use crate::database::Database;

pub use counter::CounterDAL;
pub use request::RequestDAL;

/// The Data Access Layer struct.
///
/// `DAL` is `Clone`; each clone references the same connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    pub database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Returns the Identifier Allocator.
    pub fn counters(&self) -> CounterDAL {
        CounterDAL::new(self)
    }

    /// Returns the Request Store.
    pub fn requests(&self) -> RequestDAL {
        RequestDAL::new(self)
    }
}
