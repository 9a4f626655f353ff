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


//! Remote library service contract
//!
//! [`BookService`] is the full request/response surface the engine consumes;
//! [`HttpBookService`] is the production implementation over [`ApiClient`].
//! Keeping the contract behind a trait object means tests (and alternative
//! backends) inject a fake without touching the engine.
//!
//! The remote service owns book storage and file parsing. This side only
//! ever sees the JSON contract below:
//! - `GET    /books?deviceId=<id>`           - metadata-only book list
//! - `POST   /books/upload`                  - multipart file upload
//! - `POST   /parse/{epub|txt}`              - multipart parse without upload
//! - `POST   /books/save`                    - persist a full book
//! - `GET    /books/{id}`                    - full book including chapters
//! - `GET    /books/{id}/chapter/{index}`    - single chapter body
//! - `PATCH  /books/{id}`                    - device-scoped progress update
//! - `DELETE /books/{id}`                    - remove a book
//! - `POST   /books/{id}/cover/auto`         - best-effort cover lookup

use crate::api::client::ApiClient;
use crate::error::Result;
use crate::models::{Book, BookId, Chapter, ReadingPosition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline for the progress PATCH. Progress updates ride on page turns, so
/// a slow network must never hold the reader hostage for longer than this.
pub const PROGRESS_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Import formats the parser side understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    Epub,
    Txt,
}

impl BookFormat {
    /// Map a file extension to a supported format, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "epub" => Some(BookFormat::Epub),
            "txt" => Some(BookFormat::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Txt => "txt",
        }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Raw parse result from `POST /parse/{epub|txt}`.
///
/// The parser is defensive about malformed files, so every field may be
/// missing; the import flow fills gaps from the filename.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub total_chapters: Option<u32>,
}

/// Response from `POST /books/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub book_id: BookId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub total_chapters: Option<u32>,
}

/// Device-scoped progress update for `PATCH /books/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    pub device_id: String,
    pub progress: f64,
    pub current_page: u32,
    pub current_chapter: u32,
    pub last_read_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_position: Option<ReadingPosition>,
}

/// Acknowledgement from `PATCH /books/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAck {
    /// Server-side storage location the update landed in (diagnostic)
    #[serde(default)]
    pub saved_to: Option<String>,
}

/// Response from `POST /books/{id}/cover/auto`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverMatch {
    #[serde(default)]
    pub url: Option<String>,
}

// ============================================================================
// SERVICE CONTRACT
// ============================================================================

/// Everything the sync engine asks of the remote library service
#[async_trait]
pub trait BookService: Send + Sync {
    /// Fetch the metadata-only book list for a device
    async fn list_books(&self, device_id: &str) -> Result<Vec<Book>>;

    /// Upload a file for server-side parse-and-persist in one step
    async fn upload_book(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse>;

    /// Parse an uploaded file without persisting it
    async fn parse_file(&self, format: BookFormat, filename: &str, bytes: Vec<u8>)
        -> Result<ParsedBook>;

    /// Persist a fully assembled book
    async fn save_book(&self, book: &Book) -> Result<()>;

    /// Fetch a full book, chapters included
    async fn get_book(&self, id: BookId) -> Result<Book>;

    /// Fetch a single chapter body
    async fn get_chapter(&self, id: BookId, index: u32) -> Result<Chapter>;

    /// Push a device-scoped progress update, bounded by
    /// [`PROGRESS_SYNC_TIMEOUT`]
    async fn patch_progress(&self, id: BookId, patch: &ProgressPatch) -> Result<ProgressAck>;

    /// Remove a book from the remote library
    async fn delete_book(&self, id: BookId) -> Result<()>;

    /// Ask the service to find a cover image for a book
    async fn auto_match_cover(&self, id: BookId) -> Result<Option<String>>;
}

// ============================================================================
// HTTP IMPLEMENTATION
// ============================================================================

/// Production [`BookService`] over the HTTP contract
#[derive(Debug, Clone)]
pub struct HttpBookService {
    client: ApiClient,
}

impl HttpBookService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn file_form(filename: &str, bytes: Vec<u8>) -> Form {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        Form::new().part("file", part)
    }
}

#[async_trait]
impl BookService for HttpBookService {
    async fn list_books(&self, device_id: &str) -> Result<Vec<Book>> {
        self.client.get("/books", &[("deviceId", device_id)]).await
    }

    async fn upload_book(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        self.client
            .post_multipart("/books/upload", Self::file_form(filename, bytes))
            .await
    }

    async fn parse_file(
        &self,
        format: BookFormat,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ParsedBook> {
        let endpoint = format!("/parse/{}", format.as_str());
        self.client
            .post_multipart(&endpoint, Self::file_form(filename, bytes))
            .await
    }

    async fn save_book(&self, book: &Book) -> Result<()> {
        // The ack body is ignored; status is what matters
        let _: serde_json::Value = self.client.post("/books/save", book).await?;
        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Book> {
        self.client.get_plain(&format!("/books/{}", id)).await
    }

    async fn get_chapter(&self, id: BookId, index: u32) -> Result<Chapter> {
        self.client
            .get_plain(&format!("/books/{}/chapter/{}", id, index))
            .await
    }

    async fn patch_progress(&self, id: BookId, patch: &ProgressPatch) -> Result<ProgressAck> {
        self.client
            .patch(&format!("/books/{}", id), patch, PROGRESS_SYNC_TIMEOUT)
            .await
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        self.client.delete(&format!("/books/{}", id)).await
    }

    async fn auto_match_cover(&self, id: BookId) -> Result<Option<String>> {
        let response: CoverMatch = self
            .client
            .post(&format!("/books/{}/cover/auto", id), &serde_json::json!({}))
            .await?;
        Ok(response.url.filter(|u| !u.is_empty()))
    }
}
