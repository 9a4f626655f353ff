// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Local persistence
//!
//! SQLite-backed storage for the two durable things a device keeps: the
//! quota-bounded cache of library snapshots and the identity settings. The
//! cache is always a hint - the remote service stays the source of truth
//! once a network round-trip has occurred.

pub mod cache;
pub mod database;
pub mod migrations;
pub mod settings;

// Re-export commonly used types
pub use cache::{CacheStore, QuotaClass, BOOKS_LIST_KEY};
pub use database::Database;
