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


//! Content merge engine
//!
//! Reconciles a freshly fetched book with the locally held representation of
//! the same logical entity. Two forces pull in opposite directions here:
//!
//! - Another device may have read further; its progress lands server-side
//!   and the fresh fetch carries it. Local optimistic state is presumed
//!   stale the moment a fetch completes, so the remote wins every scalar.
//! - This device may have materialized chapter bodies the metadata-level
//!   fetch ships only as placeholders. Re-downloading every body on each
//!   refresh would defeat lazy loading, so materialized local content is
//!   carried over into the merged result.
//!
//! The function is pure; callers decide what to do with the merged value.
//! Locating the local counterpart is the caller's job too, via [`BookId`]'s
//! representation-insensitive equality.
//!
//! [`BookId`]: crate::models::BookId

use crate::models::{Book, Chapter};

/// Merge a fresh remote representation with the locally held one.
///
/// Remote scalars (progress, position, metadata, chapter titles) are
/// authoritative. Chapter bodies are merged by index: a locally materialized
/// body survives; everything else follows the remote, placeholder and all.
/// Chapters present on only one side follow the remote outright, so a
/// server-side re-parse that changes the chapter count wins cleanly.
pub fn reconcile(local: &Book, remote: Book) -> Book {
    let mut merged = remote;

    for chapter in merged.chapters.iter_mut() {
        if let Some(local_chapter) = local.chapter(chapter.index) {
            if local_chapter.is_materialized() {
                chapter.content = local_chapter.content.clone();
            }
        }
    }

    merged
}

/// Apply a freshly fetched chapter body into a book's chapter slot.
///
/// The slot's title follows the fetched chapter; books listed lazily often
/// carry skeleton titles that the full chapter payload corrects.
pub fn apply_chapter(book: &mut Book, fetched: &Chapter) {
    if let Some(slot) = book.chapters.iter_mut().find(|c| c.index == fetched.index) {
        slot.title = fetched.title.clone();
        slot.content = fetched.content.clone();
    } else {
        book.chapters.push(fetched.clone());
    }
}
