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


//! Remote library service client
//!
//! The HTTP wrapper and the typed service contract the sync engine consumes.
//! The backend's storage and parsing behavior stay out of scope; only the
//! request/response shapes live here.

pub mod client;
pub mod service;

// Re-export commonly used types
pub use client::{ApiClient, ClientConfig};
pub use service::{
    BookFormat, BookService, CoverMatch, HttpBookService, ParsedBook, ProgressAck, ProgressPatch,
    UploadResponse, PROGRESS_SYNC_TIMEOUT,
};
