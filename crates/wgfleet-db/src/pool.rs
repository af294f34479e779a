// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./wgfleet.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Create the profiles table and its active-row unique indexes.
///
/// Idempotent; safe to run at every startup.
#[tracing::instrument(skip(pool))]
pub async fn migrate(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS profiles (
			id TEXT PRIMARY KEY,
			owner_id TEXT NOT NULL,
			profile_name TEXT NOT NULL,
			profile_kind TEXT NOT NULL,
			public_key TEXT NOT NULL,
			private_key TEXT NOT NULL,
			address TEXT NOT NULL,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	// At most one active row per address, per public key, and per
	// (owner, profile name).
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_active_address
		 ON profiles(address) WHERE is_active = 1",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_active_public_key
		 ON profiles(public_key) WHERE is_active = 1",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_active_owner_name
		 ON profiles(owner_id, profile_name) WHERE is_active = 1",
	)
	.execute(pool)
	.await?;

	tracing::debug!("database schema ready");
	Ok(())
}
