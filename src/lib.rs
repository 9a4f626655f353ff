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


//! PageTurn core: reading-state synchronization and cache engine
//!
//! The client-side engine that keeps a device's view of a personal library
//! consistent with a remote source of truth while tolerating network
//! failure, bounding local storage on constrained devices, reconciling
//! partially loaded content across reloads, and disambiguating book
//! identity across devices and loosely typed identifiers.
//!
//! # Components
//! - [`device`] - stable per-device identity, used to scope every request
//! - [`storage`] - SQLite-backed settings plus the quota-bounded cache
//! - [`api`] - typed client for the remote library service
//! - [`library`] - snapshot manager, content merge engine and progress
//!   synchronizer
//!
//! Rendering, file-format parsing and the backend's own storage are
//! external collaborators; only their request/response contract lives here.
//!
//! # Example
//! ```no_run
//! use pageturn_core::api::{ApiClient, HttpBookService};
//! use pageturn_core::device::DeviceManager;
//! use pageturn_core::library::{LibraryManager, ProgressUpdate};
//! use pageturn_core::storage::{CacheStore, Database};
//! use std::sync::Arc;
//!
//! # async fn example() -> pageturn_core::error::Result<()> {
//! let db = Database::new(Database::get_default_path()).await?;
//! let client = ApiClient::new("http://localhost:8000/api".parse().unwrap())?;
//!
//! let library = LibraryManager::new(
//!     Arc::new(HttpBookService::new(client)),
//!     CacheStore::new(db.clone()),
//!     Arc::new(DeviceManager::new(db)),
//! );
//!
//! library.load_books().await?;
//! for book in library.books().await {
//!     println!("{} ({:.0}%)", book.title, book.progress);
//! }
//!
//! if let Some(book) = library.books().await.first() {
//!     library
//!         .update_progress(book.id, ProgressUpdate::at_page(5, 1))
//!         .await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod device;
pub mod error;
pub mod library;
pub mod models;
pub mod storage;

// Re-export the types most embedders need
pub use api::{ApiClient, BookService, HttpBookService};
pub use device::DeviceManager;
pub use error::{PageTurnError, Result};
pub use library::{LibraryManager, ProgressOutcome, ProgressUpdate, SaveLocation};
pub use models::{Book, BookId, Chapter, ReadingPosition};
pub use storage::{CacheStore, Database};
