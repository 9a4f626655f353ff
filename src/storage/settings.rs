// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Settings storage operations
//!
//! Plain key/value accessors over the `Settings` table. Used for the two
//! unbounded-lifetime identity keys (device id, device label); settings are
//! never subject to the cache quota.

use crate::error::Result;
use sqlx::SqlitePool;

/// Save or update a setting
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `key` - Setting name
/// * `value` - Setting value
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO Settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a setting value, or None if unset
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM Settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(value,)| value))
}

/// Remove a setting
pub async fn remove(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM Settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
