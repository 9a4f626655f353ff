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


//! Quota-bounded cache store
//!
//! A key/value persistence layer for serialized library snapshots. Writes are
//! measured before they land: a payload over the active byte quota is refused
//! and any existing entry under that key is deleted, so a reader never sees a
//! stale entry that a newer, bigger snapshot failed to replace. This is a
//! hygiene safeguard, not an LRU - entries are only ever dropped by refusal
//! or explicit invalidation, never by recency.
//!
//! The quota has two size classes, picked from the compile target rather than
//! user configuration: constrained mobile targets get a small budget, desktops
//! a larger one. Each entry records its own byte count, so additional cached
//! artifacts get per-entry accounting for free.
//!
//! The store is a plain value handed to its consumers (no ambient global);
//! tests swap in an in-memory database and the process-wide lifetime of the
//! real store comes from whoever owns it.

use crate::error::{PageTurnError, Result};
use crate::storage::database::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Well-known cache key for the serialized library snapshot
pub const BOOKS_LIST_KEY: &str = "books_list";

/// Byte budget for constrained (mobile) targets
const CONSTRAINED_QUOTA_BYTES: usize = 1024 * 1024; // 1 MiB

/// Byte budget for everything else
const STANDARD_QUOTA_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

/// Cache size class, detected from environment signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaClass {
    /// Memory-constrained runtime (phones, tablets)
    Constrained,
    /// Desktop-class runtime
    Standard,
}

impl QuotaClass {
    /// Detect the active size class from the compile target.
    ///
    /// Not user-configurable: the point is to bound local storage on devices
    /// that cannot afford a bloated cache, not to offer a tuning knob.
    pub fn detect() -> Self {
        #[cfg(any(target_os = "android", target_os = "ios"))]
        {
            QuotaClass::Constrained
        }

        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        {
            QuotaClass::Standard
        }
    }

    /// Maximum serialized size accepted for a single entry
    pub fn max_bytes(&self) -> usize {
        match self {
            QuotaClass::Constrained => CONSTRAINED_QUOTA_BYTES,
            QuotaClass::Standard => STANDARD_QUOTA_BYTES,
        }
    }
}

/// Bounded cache store over the `CacheEntries` table
#[derive(Debug, Clone)]
pub struct CacheStore {
    db: Database,
    quota: QuotaClass,
}

impl CacheStore {
    /// Create a store with the detected quota class
    pub fn new(db: Database) -> Self {
        Self::with_quota(db, QuotaClass::detect())
    }

    /// Create a store with an explicit quota class.
    ///
    /// Embedders on unusual targets can override detection; tests use this to
    /// exercise both classes on one machine.
    pub fn with_quota(db: Database, quota: QuotaClass) -> Self {
        Self { db, quota }
    }

    /// Active quota class
    pub fn quota(&self) -> QuotaClass {
        self.quota
    }

    /// Serialize and persist a value under `key`, subject to the quota.
    ///
    /// Returns `Ok(true)` when the entry landed, `Ok(false)` when it was
    /// refused for size. A refused write also deletes any existing entry
    /// under the key: no cache beats a stale cache.
    ///
    /// # Errors
    /// A serialization failure clears the whole cache namespace (breaking any
    /// write-after-failure loop) and is then reported. Database errors are
    /// reported as-is.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<bool> {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "cache serialization failed, clearing namespace");
                self.clear().await?;
                return Err(PageTurnError::from(e));
            }
        };

        let byte_size = serialized.len();
        if byte_size > self.quota.max_bytes() {
            warn!(
                key,
                byte_size,
                quota = self.quota.max_bytes(),
                "cache write refused: payload exceeds quota"
            );
            self.invalidate(key).await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO CacheEntries (key, value, byte_size) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                byte_size = excluded.byte_size,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(&serialized)
        .bind(byte_size as i64)
        .execute(self.db.pool())
        .await?;

        debug!(key, byte_size, "cache entry written");
        Ok(true)
    }

    /// Read and deserialize the entry under `key`.
    ///
    /// Returns `Ok(None)` on a miss. An entry that exists but cannot be
    /// parsed is reported as [`PageTurnError::CacheIntegrity`] so the caller
    /// can invalidate and fall through to the network.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM CacheEntries WHERE key = ?")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;

        let Some((serialized,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&serialized) {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(PageTurnError::CacheIntegrity {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Remove the entry under `key`, if any
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM CacheEntries WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;

        debug!(key, "cache entry invalidated");
        Ok(())
    }

    /// Drop every entry in the cache namespace. Settings are untouched.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM CacheEntries")
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Recorded byte size of the entry under `key`, if present
    pub async fn entry_size(&self, key: &str) -> Result<Option<u64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT byte_size FROM CacheEntries WHERE key = ?")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.map(|(size,)| size as u64))
    }
}
