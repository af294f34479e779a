// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository for profile allocation records.

use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;

/// `(id, owner_id, profile_name, profile_kind, public_key, private_key,
/// address, created_at)`; active rows only unless noted otherwise.
pub type ProfileRowTuple = (
	String,
	String,
	String,
	String,
	String,
	String,
	String,
	String,
);

/// Repository for profile allocation database operations.
#[derive(Clone)]
pub struct ProfileRepository {
	pool: SqlitePool,
}

impl ProfileRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, public_key, private_key), fields(%id, %owner_id, %address))]
	pub async fn insert_profile(
		&self,
		id: Uuid,
		owner_id: &str,
		profile_name: &str,
		profile_kind: &str,
		public_key: &str,
		private_key: &str,
		address: &str,
	) -> Result<(), DbError> {
		sqlx::query(
			"INSERT INTO profiles (id, owner_id, profile_name, profile_kind, public_key,
			                       private_key, address, is_active, created_at)
			 VALUES (?, ?, ?, ?, ?, ?, ?, 1, datetime('now'))",
		)
		.bind(id.to_string())
		.bind(owner_id)
		.bind(profile_name)
		.bind(profile_kind)
		.bind(public_key)
		.bind(private_key)
		.bind(address)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Every address currently committed to an active record. This is the
	/// Allocation Index side of the reconciled usage view.
	#[tracing::instrument(skip(self))]
	pub async fn active_addresses(&self) -> Result<Vec<String>, DbError> {
		let rows: Vec<(String,)> =
			sqlx::query_as("SELECT address FROM profiles WHERE is_active = 1")
				.fetch_all(&self.pool)
				.await?;

		Ok(rows.into_iter().map(|(address,)| address).collect())
	}

	/// Narrow re-check for one exact address against active rows only.
	#[tracing::instrument(skip(self), fields(%address))]
	pub async fn is_address_active(&self, address: &str) -> Result<bool, DbError> {
		let count: i64 =
			sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE address = ? AND is_active = 1")
				.bind(address)
				.fetch_one(&self.pool)
				.await?;

		Ok(count > 0)
	}

	#[tracing::instrument(skip(self), fields(%owner_id, %profile_name))]
	pub async fn find_active_by_owner_and_name(
		&self,
		owner_id: &str,
		profile_name: &str,
	) -> Result<Option<ProfileRowTuple>, DbError> {
		let row: Option<ProfileRowTuple> = sqlx::query_as(
			"SELECT id, owner_id, profile_name, profile_kind, public_key, private_key,
			        address, created_at
			 FROM profiles WHERE owner_id = ? AND profile_name = ? AND is_active = 1",
		)
		.bind(owner_id)
		.bind(profile_name)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row)
	}

	#[tracing::instrument(skip(self), fields(%owner_id))]
	pub async fn list_active_for_owner(
		&self,
		owner_id: &str,
	) -> Result<Vec<ProfileRowTuple>, DbError> {
		let rows: Vec<ProfileRowTuple> = sqlx::query_as(
			"SELECT id, owner_id, profile_name, profile_kind, public_key, private_key,
			        address, created_at
			 FROM profiles WHERE owner_id = ? AND is_active = 1
			 ORDER BY created_at ASC, rowid ASC",
		)
		.bind(owner_id)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows)
	}

	#[tracing::instrument(skip(self), fields(%owner_id))]
	pub async fn count_active_for_owner(&self, owner_id: &str) -> Result<i64, DbError> {
		let count: i64 =
			sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE owner_id = ? AND is_active = 1")
				.bind(owner_id)
				.fetch_one(&self.pool)
				.await?;

		Ok(count)
	}

	/// Soft-delete: the row stays for history, the address and key become
	/// reusable.
	#[tracing::instrument(skip(self), fields(%id))]
	pub async fn deactivate(&self, id: Uuid) -> Result<u64, DbError> {
		let result = sqlx::query("UPDATE profiles SET is_active = 0 WHERE id = ? AND is_active = 1")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}
}
