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


//! Library snapshot manager
//!
//! Owns the in-memory book list and orchestrates cache-vs-network precedence.
//! The cached snapshot is a read-through accelerator: listing during a
//! session is served from it, and every mutation (import, upload, delete,
//! cover match) invalidates it so the next load refetches. The cache is
//! never trusted over the network once a round-trip has happened - it is a
//! hint, self-healed when corrupt, dropped when over budget.
//!
//! All operations run on one cooperative scheduling context; the list lock
//! is held only across synchronous sections, never across a network await,
//! so optimistic mutations are race-free with respect to synchronous reads.
//! Two overlapping progress updates for the same book can still interleave
//! their remote confirmations; the remote applies last-writer-wins without
//! an ordering token. Known limitation.

use crate::api::{BookFormat, BookService, ProgressPatch};
use crate::device::DeviceManager;
use crate::error::{PageTurnError, Result};
use crate::library::merge::{apply_chapter, reconcile};
use crate::library::progress::{apply_progress, ProgressOutcome, ProgressUpdate};
use crate::models::{Book, BookId, Chapter};
use crate::storage::{CacheStore, BOOKS_LIST_KEY};
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Deadline for remote progress confirmation, enforced at the synchronizer
/// regardless of the service implementation's own transport timeouts.
const PROGRESS_DEADLINE: std::time::Duration = crate::api::PROGRESS_SYNC_TIMEOUT;

/// Where a snapshot load was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Served from the cached snapshot; no network call was made
    Cache,
    /// Fetched from the remote service
    Network,
}

/// The device's view of the library
pub struct LibraryManager {
    service: Arc<dyn BookService>,
    cache: CacheStore,
    device: Arc<DeviceManager>,
    books: Arc<Mutex<Vec<Book>>>,
}

impl LibraryManager {
    pub fn new(service: Arc<dyn BookService>, cache: CacheStore, device: Arc<DeviceManager>) -> Self {
        Self {
            service,
            cache,
            device,
            books: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the current in-memory list
    pub async fn books(&self) -> Vec<Book> {
        self.books.lock().await.clone()
    }

    /// Find a book by value-equivalent id
    pub async fn get_book(&self, id: BookId) -> Option<Book> {
        self.books.lock().await.iter().find(|b| b.id == id).cloned()
    }

    // ========================================================================
    // SNAPSHOT LOADING
    // ========================================================================

    /// Load the book list, cache first.
    ///
    /// A parseable cached snapshot is authoritative for listing during the
    /// session: it is deduplicated (self-healing any upstream corruption),
    /// published, and no network call is made. A miss or an unreadable entry
    /// falls through to a device-scoped fetch whose result is published and
    /// then cached best-effort.
    ///
    /// # Errors
    /// Only the network path can fail; the in-memory list is left untouched
    /// so the caller can retry through normal navigation.
    pub async fn load_books(&self) -> Result<LoadSource> {
        if let Some(cached) = self.read_cached_snapshot().await {
            let (list, removed) = dedupe_books(cached);
            if removed > 0 {
                warn!(removed, "cache snapshot contained duplicate book ids, self-healed");
                // Rewrite through the bounded path; refusal just means the
                // next load refetches
                if let Err(e) = self.cache.write(BOOKS_LIST_KEY, &list).await {
                    warn!(error = %e, "failed to rewrite deduplicated snapshot");
                }
            }

            *self.books.lock().await = list;
            return Ok(LoadSource::Cache);
        }

        let device_id = self.device.device_id().await;
        let list = self.service.list_books(&device_id).await?;
        info!(count = list.len(), "book list fetched");

        *self.books.lock().await = list.clone();
        self.write_snapshot_best_effort(&list).await;

        Ok(LoadSource::Network)
    }

    /// Read the cached snapshot, invalidating unreadable entries
    async fn read_cached_snapshot(&self) -> Option<Vec<Book>> {
        match self.cache.read::<Vec<Book>>(BOOKS_LIST_KEY).await {
            Ok(hit) => hit,
            Err(PageTurnError::CacheIntegrity { key, reason }) => {
                warn!(key = %key, reason = %reason, "cached snapshot unreadable, invalidating");
                if let Err(e) = self.cache.invalidate(BOOKS_LIST_KEY).await {
                    warn!(error = %e, "failed to invalidate corrupt snapshot");
                }
                None
            }
            Err(e) => {
                // Storage trouble is a cache miss, not a load failure
                warn!(error = %e, "cache read failed, falling through to network");
                None
            }
        }
    }

    /// Cache the list; capacity refusal and storage failure are both non-fatal
    async fn write_snapshot_best_effort(&self, list: &[Book]) {
        match self.cache.write(BOOKS_LIST_KEY, &list).await {
            Ok(true) => {}
            Ok(false) => debug!("snapshot over quota, not cached"),
            Err(e) => warn!(error = %e, "snapshot cache write failed"),
        }
    }

    /// Drop the cached snapshot so the next load refetches
    async fn invalidate_snapshot(&self) {
        if let Err(e) = self.cache.invalidate(BOOKS_LIST_KEY).await {
            warn!(error = %e, "cache invalidation failed");
        }
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Import a book: parse remotely, assemble locally, persist, publish.
    ///
    /// The extension gate runs before any request is issued; unsupported
    /// files are rejected synchronously. Failures here are user-facing.
    pub async fn import_book(&self, filename: &str, bytes: Vec<u8>) -> Result<Book> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = BookFormat::from_extension(extension)
            .ok_or_else(|| PageTurnError::UnsupportedFormat(extension.to_string()))?;

        let parsed = self.service.parse_file(format, filename, bytes).await?;

        let now = Utc::now();
        let total_pages = parsed
            .total_chapters
            .unwrap_or(parsed.chapters.len() as u32);
        let title = parsed
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| filename_stem(filename));

        let book = Book {
            id: BookId::from_timestamp(now),
            title,
            author: parsed.author.unwrap_or_else(|| "Unknown author".to_string()),
            format: format.as_str().to_string(),
            file_path: Some(filename.to_string()),
            cover: parsed.cover,
            chapters: parsed.chapters,
            total_pages,
            progress: 0.0,
            current_page: 0,
            current_chapter: 0,
            reading_position: None,
            created_at: now,
            last_read_at: now,
        };

        self.service.save_book(&book).await?;
        info!(id = %book.id, title = %book.title, "book imported");

        self.books.lock().await.insert(0, book.clone());
        self.invalidate_snapshot().await;

        Ok(book)
    }

    /// Upload a book for server-side parse-and-persist in one step
    pub async fn upload_book(&self, filename: &str, bytes: Vec<u8>) -> Result<Book> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = BookFormat::from_extension(extension)
            .ok_or_else(|| PageTurnError::UnsupportedFormat(extension.to_string()))?;

        let response = self.service.upload_book(filename, bytes).await?;

        let now = Utc::now();
        let book = Book {
            id: response.book_id,
            title: response
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| filename_stem(filename)),
            author: response.author.unwrap_or_else(|| "Unknown author".to_string()),
            format: format.as_str().to_string(),
            file_path: Some(filename.to_string()),
            cover: response.cover,
            chapters: Vec::new(),
            total_pages: response.total_chapters.unwrap_or(0),
            progress: 0.0,
            current_page: 0,
            current_chapter: 0,
            reading_position: None,
            created_at: now,
            last_read_at: now,
        };

        info!(id = %book.id, title = %book.title, "book uploaded");
        self.books.lock().await.insert(0, book.clone());
        self.invalidate_snapshot().await;

        Ok(book)
    }

    /// Delete a book remotely and locally. Failures are user-facing.
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        self.service.delete_book(id).await?;

        self.books.lock().await.retain(|b| b.id != id);
        self.invalidate_snapshot().await;
        info!(id = %id, "book deleted");

        Ok(())
    }

    /// Kick off a best-effort cover lookup as a detached background task.
    ///
    /// The handle is the task's failure channel: callers may await it for
    /// the result, abort it, or drop it and let the lookup finish on its
    /// own. A found cover is applied to the in-memory book and the snapshot
    /// invalidated; failures never surface to the caller's control flow.
    pub fn auto_match_cover(&self, id: BookId) -> JoinHandle<Result<Option<String>>> {
        let service = Arc::clone(&self.service);
        let cache = self.cache.clone();
        let books = Arc::clone(&self.books);

        tokio::spawn(async move {
            let url = match service.auto_match_cover(id).await {
                Ok(url) => url,
                Err(e) => {
                    warn!(id = %id, error = %e, "cover match failed");
                    return Err(e);
                }
            };

            if let Some(url) = &url {
                let mut list = books.lock().await;
                if let Some(book) = list.iter_mut().find(|b| b.id == id) {
                    book.cover = Some(url.clone());
                }
                drop(list);

                if let Err(e) = cache.invalidate(BOOKS_LIST_KEY).await {
                    warn!(error = %e, "cache invalidation after cover match failed");
                }
                info!(id = %id, "cover matched");
            }

            Ok(url)
        })
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    /// Get a book's full content, fetching and reconciling when needed.
    ///
    /// A local book whose chapter bodies are already materialized is
    /// returned as-is; anything else goes through [`Self::refresh_book`].
    pub async fn fetch_book_content(&self, id: BookId) -> Result<Book> {
        {
            let list = self.books.lock().await;
            if let Some(book) = list.iter().find(|b| b.id == id) {
                if book.has_content() {
                    return Ok(book.clone());
                }
            }
        }

        self.refresh_book(id).await
    }

    /// Fetch the full remote representation and reconcile it with local
    /// state.
    ///
    /// This is the metadata-refresh path: remote scalars (including another
    /// device's progress) win, while chapter bodies this device already
    /// materialized are carried over instead of being re-fetched.
    pub async fn refresh_book(&self, id: BookId) -> Result<Book> {
        let remote = self.service.get_book(id).await?;

        let mut list = self.books.lock().await;
        let merged = match list.iter().position(|b| b.id == id) {
            Some(index) => {
                let merged = reconcile(&list[index], remote);
                list[index] = merged.clone();
                merged
            }
            None => {
                list.push(remote.clone());
                remote
            }
        };

        Ok(merged)
    }

    /// Fetch a single chapter on demand.
    ///
    /// Returns `None` on any failure: a missing chapter body is a
    /// recoverable, retryable UI state, not a fatal condition. A fetched
    /// body is applied into the local book's chapter slot.
    pub async fn fetch_chapter(&self, id: BookId, index: u32) -> Option<Chapter> {
        match self.service.get_chapter(id, index).await {
            Ok(chapter) => {
                let mut list = self.books.lock().await;
                if let Some(book) = list.iter_mut().find(|b| b.id == id) {
                    apply_chapter(book, &chapter);
                }
                Some(chapter)
            }
            Err(e) => {
                debug!(id = %id, index, error = %e, "chapter fetch failed");
                None
            }
        }
    }

    // ========================================================================
    // PROGRESS SYNCHRONIZATION
    // ========================================================================

    /// Record a position change: optimistic local apply, then best-effort
    /// remote confirmation on a fixed deadline.
    ///
    /// The local mutation is visible to the rest of the system immediately
    /// and is never rolled back. Remote failure or timeout downgrades the
    /// outcome to `location: Local` - still a success from the reader's
    /// point of view.
    pub async fn update_progress(&self, id: BookId, update: ProgressUpdate) -> ProgressOutcome {
        let device_id = self.device.device_id().await;
        let now = Utc::now();

        // Optimistic, synchronous local apply
        let patch = {
            let mut list = self.books.lock().await;
            let Some(book) = list.iter_mut().find(|b| b.id == id) else {
                return ProgressOutcome::not_found();
            };

            apply_progress(book, &update, now);

            ProgressPatch {
                device_id,
                progress: book.progress,
                current_page: book.current_page,
                current_chapter: book.current_chapter,
                last_read_at: book.last_read_at,
                reading_position: book.reading_position,
            }
        };

        let confirmation =
            tokio::time::timeout(PROGRESS_DEADLINE, self.service.patch_progress(id, &patch)).await;

        match confirmation {
            Ok(Ok(ack)) => {
                let list = self.books.lock().await.clone();
                self.write_snapshot_best_effort(&list).await;
                ProgressOutcome::cloud(ack.saved_to)
            }
            Ok(Err(e)) => {
                warn!(id = %id, error = %e, "progress sync failed, keeping local state");
                ProgressOutcome::local(e.to_string())
            }
            Err(_) => {
                let e = PageTurnError::Timeout(PROGRESS_DEADLINE.as_millis() as u64);
                warn!(id = %id, "progress sync timed out, keeping local state");
                ProgressOutcome::local(e.to_string())
            }
        }
    }
}

/// Retain the first occurrence per id, returning the count removed
fn dedupe_books(list: Vec<Book>) -> (Vec<Book>, usize) {
    let original = list.len();
    let mut seen: HashSet<BookId> = HashSet::with_capacity(original);
    let deduped: Vec<Book> = list
        .into_iter()
        .filter(|book| seen.insert(book.id))
        .collect();

    let removed = original - deduped.len();
    (deduped, removed)
}

/// Filename without its extension, as an import title of last resort
fn filename_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}
