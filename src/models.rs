//! Library data model
//!
//! Wire-compatible representations of books, chapters and reading positions.
//! Field names are camelCase on the wire; lazy list responses omit chapter
//! bodies, so everything a metadata-only payload can leave out is defaulted.
//!
//! # Identifier semantics
//! Book identifiers are assigned client-side at import time from a millisecond
//! timestamp. They cross a network boundary and may come back as JSON numbers
//! or numeric strings depending on the producer, so [`BookId`] normalizes both
//! representations at the deserialization boundary and compares by value.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Sentinel stored in a chapter's `content` slot while the body has not been
/// fetched yet. Equivalent to an absent body for merge purposes.
pub const PENDING_CONTENT: &str = "__pageturn_pending__";

// ============================================================================
// BOOK IDENTIFIER
// ============================================================================

/// Value type for book identifiers with representation-insensitive equality.
///
/// Identifiers are numeric (millisecond timestamps assigned at import), but
/// JSON producers are not consistent about emitting them as numbers vs.
/// strings. Deserialization accepts both; equality and hashing always operate
/// on the normalized numeric value, which eliminates lookup-miss bugs when an
/// id round-trips through the network as `"1715600000000"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(i64);

impl BookId {
    /// Wrap a raw numeric identifier
    pub fn new(raw: i64) -> Self {
        BookId(raw)
    }

    /// Assign a fresh identifier from the current wall clock, the same way
    /// the import flow stamps new books.
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        BookId(now.timestamp_millis())
    }

    /// Parse from a textual representation ("42" == 42)
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<i64>().ok().map(BookId)
    }

    /// Raw numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BookId {
    fn from(raw: i64) -> Self {
        BookId(raw)
    }
}

impl FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(BookId)
    }
}

impl Serialize for BookId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BookIdVisitor;

        impl<'de> Visitor<'de> for BookIdVisitor {
            type Value = BookId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer book id or its string representation")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<BookId, E> {
                Ok(BookId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<BookId, E> {
                i64::try_from(v)
                    .map(BookId)
                    .map_err(|_| E::custom(format!("book id {} out of range", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<BookId, E> {
                BookId::parse(v)
                    .ok_or_else(|| E::custom(format!("'{}' is not a numeric book id", v)))
            }
        }

        deserializer.deserialize_any(BookIdVisitor)
    }
}

// ============================================================================
// READING POSITION
// ============================================================================

/// Authoritative, re-derivable locator within a book.
///
/// Pagination shifts when lazily loaded chapters change page counts, so the
/// absolute `currentPage` alone is not stable across reloads. This triple is:
/// the chapter index survives re-pagination, the relative page narrows the
/// spot inside the chapter, and the scroll percentage recovers the exact
/// viewport offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    pub chapter_index: u32,
    pub relative_page_index: u32,
    /// Fraction of the current page scrolled, in [0, 1]
    pub scroll_percentage: f64,
}

impl ReadingPosition {
    pub fn new(chapter_index: u32, relative_page_index: u32, scroll_percentage: f64) -> Self {
        Self {
            chapter_index,
            relative_page_index,
            scroll_percentage: scroll_percentage.clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// CHAPTER
// ============================================================================

/// A single chapter. `content` is `None` until the body is fetched; lazy
/// producers may also ship a recognizable placeholder instead of omitting
/// the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl Chapter {
    /// Chapter shell with no body, as produced by metadata-only parses
    pub fn unloaded(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            content: None,
        }
    }

    /// Whether this chapter carries real, materialized body text.
    ///
    /// Absent content, empty content and the pending-placeholder sentinel
    /// all count as unmaterialized; only these chapters may be overwritten
    /// wholesale during a merge.
    pub fn is_materialized(&self) -> bool {
        match self.content.as_deref() {
            Some(text) => !text.is_empty() && text != PENDING_CONTENT,
            None => false,
        }
    }
}

// ============================================================================
// BOOK
// ============================================================================

/// A book in the library.
///
/// The metadata-only list endpoint omits `chapters`; a full fetch includes
/// them. Progress fields are mutated optimistically by the progress
/// synchronizer and are presumed stale once a fresh remote fetch completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub total_pages: u32,
    /// Percent read, in [0, 100]
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub current_chapter: u32,
    #[serde(default)]
    pub reading_position: Option<ReadingPosition>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_read_at: DateTime<Utc>,
}

impl Book {
    /// Whether any chapter body has actually been materialized.
    ///
    /// A lazily listed book can carry a full chapter skeleton (titles and
    /// placeholders) without a single body, so chapter count alone is not
    /// enough to skip a content fetch.
    pub fn has_content(&self) -> bool {
        !self.chapters.is_empty() && self.chapters.iter().any(Chapter::is_materialized)
    }

    /// Chapter lookup by index
    pub fn chapter(&self, index: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.index == index)
    }
}
