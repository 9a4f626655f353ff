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


//! Progress update types and the optimistic local apply
//!
//! A progress update lands in two stages: the in-memory book is mutated
//! immediately (so every subsequent read in the process sees the new
//! position), then remote confirmation is attempted on a bounded deadline.
//! The outcome reports where the update durably landed; a connectivity
//! failure is not a failure of the update. This trades strict cross-device
//! consistency for availability: a device's last-known position always
//! reflects its own most recent read, and convergence happens on the next
//! successful sync.

use crate::models::{Book, ReadingPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position change reported by the reading surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Absolute page across the whole book
    pub page: u32,
    /// Chapter the reader is in
    pub chapter: u32,
    /// Page within that chapter (survives re-pagination)
    pub relative_page: u32,
    /// Scroll offset within the page, in [0, 1]
    pub scroll_percentage: f64,
}

impl ProgressUpdate {
    pub fn new(page: u32, chapter: u32, relative_page: u32, scroll_percentage: f64) -> Self {
        Self {
            page,
            chapter,
            relative_page,
            scroll_percentage,
        }
    }

    /// Update with no intra-chapter detail (page-level navigation)
    pub fn at_page(page: u32, chapter: u32) -> Self {
        Self::new(page, chapter, 0, 0.0)
    }
}

/// Where a progress update durably landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveLocation {
    /// Confirmed by the remote service
    Cloud,
    /// Applied in memory only; remote confirmation failed or timed out
    Local,
    /// Nothing happened - the book wasn't found
    None,
}

/// Result of a progress synchronization attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOutcome {
    /// Whether the user-visible update took effect (local durability counts)
    pub success: bool,
    pub location: SaveLocation,
    /// Server-side storage detail, when the cloud confirmed
    pub saved_to: Option<String>,
    /// The degrade reason, when confirmation failed
    pub error: Option<String>,
}

impl ProgressOutcome {
    pub fn cloud(saved_to: Option<String>) -> Self {
        Self {
            success: true,
            location: SaveLocation::Cloud,
            saved_to,
            error: None,
        }
    }

    pub fn local(error: String) -> Self {
        Self {
            success: true,
            location: SaveLocation::Local,
            saved_to: None,
            error: Some(error),
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: false,
            location: SaveLocation::None,
            saved_to: None,
            error: None,
        }
    }
}

/// Apply an update to the in-memory book, optimistically and synchronously.
///
/// Progress is recomputed as `page / max(totalPages, 1) * 100`, clamped to
/// [0, 100] so a page index past the pagination estimate can't overshoot.
pub fn apply_progress(book: &mut Book, update: &ProgressUpdate, now: DateTime<Utc>) {
    let total = book.total_pages.max(1) as f64;
    book.progress = (update.page as f64 / total * 100.0).clamp(0.0, 100.0);
    book.current_page = update.page;
    book.current_chapter = update.chapter;
    book.reading_position = Some(ReadingPosition::new(
        update.chapter,
        update.relative_page,
        update.scroll_percentage,
    ));
    book.last_read_at = now;
}
