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


//! Library engine
//!
//! The snapshot manager, content merge engine and progress synchronizer:
//! everything that keeps a device's view of the library consistent with the
//! remote source of truth while tolerating network failure.

pub mod manager;
pub mod merge;
pub mod progress;

// Re-export commonly used types
pub use manager::{LibraryManager, LoadSource};
pub use merge::reconcile;
pub use progress::{ProgressOutcome, ProgressUpdate, SaveLocation};
