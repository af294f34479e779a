// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use wgfleet_db::{ProfileRepository, ProfileRowTuple};

use crate::allocator::Allocator;
use crate::artifact::ArtifactStore;
use crate::client_config;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::mutator::PeerMutator;
use crate::pools::{AddressPools, ProfileKind};
use crate::system::WgRuntime;

/// A fully materialized allocation record.
#[derive(Clone)]
pub struct Profile {
	pub id: Uuid,
	pub owner_id: String,
	pub profile_name: String,
	pub kind: ProfileKind,
	pub public_key: String,
	pub private_key: String,
	pub address: Ipv4Addr,
	pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Profile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Profile")
			.field("id", &self.id)
			.field("owner_id", &self.owner_id)
			.field("profile_name", &self.profile_name)
			.field("kind", &self.kind)
			.field("public_key", &self.public_key)
			.field("private_key", &"<redacted>")
			.field("address", &self.address)
			.field("created_at", &self.created_at)
			.finish()
	}
}

impl TryFrom<ProfileRowTuple> for Profile {
	type Error = EngineError;

	fn try_from(row: ProfileRowTuple) -> Result<Self> {
		let (id, owner_id, profile_name, profile_kind, public_key, private_key, address, created_at) =
			row;

		Ok(Self {
			id: Uuid::parse_str(&id)
				.map_err(|e| EngineError::Internal(format!("invalid profile id '{id}': {e}")))?,
			kind: profile_kind
				.parse()
				.map_err(|_| EngineError::Internal(format!("unknown profile kind '{profile_kind}'")))?,
			address: address
				.parse()
				.map_err(|e| EngineError::Internal(format!("invalid address '{address}': {e}")))?,
			created_at: parse_datetime(&created_at)?,
			owner_id,
			profile_name,
			public_key,
			private_key,
		})
	}
}

/// What callers see when listing profiles; carries no key material.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
	pub profile_name: String,
	pub kind: ProfileKind,
	pub address: Ipv4Addr,
	pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileSummary {
	fn from(profile: Profile) -> Self {
		Self {
			profile_name: profile.profile_name,
			kind: profile.kind,
			address: profile.address,
			created_at: profile.created_at,
		}
	}
}

/// Everything a freshly provisioned client needs, ready to hand out.
#[derive(Clone, Serialize)]
pub struct Provisioned {
	pub profile_name: String,
	pub kind: ProfileKind,
	pub address: Ipv4Addr,
	pub private_key: String,
	pub client_config: String,
	pub file_name: String,
}

impl fmt::Debug for Provisioned {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provisioned")
			.field("profile_name", &self.profile_name)
			.field("kind", &self.kind)
			.field("address", &self.address)
			.field("private_key", &"<redacted>")
			.field("file_name", &self.file_name)
			.finish()
	}
}

/// SQLite's `datetime('now')` produces `%Y-%m-%d %H:%M:%S`; anything
/// written by other tooling is expected to be RFC 3339.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Ok(dt.with_timezone(&Utc));
	}

	NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
		.map(|naive| Utc.from_utc_datetime(&naive))
		.map_err(|e| EngineError::Internal(format!("invalid datetime '{s}': {e}")))
}

/// Front-end of the engine: provisions, revokes and lists client profiles
/// while keeping the relational store and the live artifact consistent.
///
/// Every allocate-then-commit and remove-then-deactivate sequence runs
/// under one mutex, from the owner-cap and duplicate-name checks until
/// the relational write lands. Keypair generation happens outside the
/// lock; it touches neither store.
pub struct ProvisionService {
	config: Arc<EngineConfig>,
	repo: ProfileRepository,
	allocator: Allocator,
	mutator: PeerMutator,
	runtime: Arc<dyn WgRuntime>,
	commit_lock: Mutex<()>,
}

impl ProvisionService {
	pub fn new(
		config: Arc<EngineConfig>,
		pools: AddressPools,
		repo: ProfileRepository,
		store: Arc<dyn ArtifactStore>,
		runtime: Arc<dyn WgRuntime>,
	) -> Self {
		Self {
			config,
			allocator: Allocator::new(pools, repo.clone()),
			mutator: PeerMutator::new(store, runtime.clone()),
			repo,
			runtime,
			commit_lock: Mutex::new(()),
		}
	}

	/// Creates a profile: allocates an address, appends the peer stanza to
	/// the artifact, then commits the allocation record. The artifact is
	/// written strictly before the relational commit; a failure in between
	/// leaves the address blocked in the usage view, never double-assigned.
	#[instrument(skip(self), fields(%owner_id, %profile_name, %kind))]
	pub async fn provision(
		&self,
		owner_id: &str,
		profile_name: &str,
		kind: ProfileKind,
	) -> Result<Provisioned> {
		let keypair = self.runtime.generate_keypair().await?;

		let _commit = self.commit_lock.lock().await;

		// Cap and name checks run under the lock; a concurrent winner must
		// be visible before this request touches the artifact.
		let count = self.repo.count_active_for_owner(owner_id).await?;
		if count as usize >= self.config.max_profiles_per_owner {
			return Err(EngineError::ProfileLimit(self.config.max_profiles_per_owner));
		}

		if self
			.repo
			.find_active_by_owner_and_name(owner_id, profile_name)
			.await?
			.is_some()
		{
			return Err(EngineError::ProfileExists(profile_name.to_string()));
		}

		let mut doc = self.mutator.load().await?;
		let address = self.allocator.allocate(kind, &doc).await?;

		self.mutator
			.add_peer(&mut doc, profile_name, &keypair.public_key, address)
			.await?;

		self.repo
			.insert_profile(
				Uuid::new_v4(),
				owner_id,
				profile_name,
				kind.as_str(),
				&keypair.public_key,
				&keypair.private_key,
				&address.to_string(),
			)
			.await?;

		info!(%address, "profile provisioned");

		Ok(Provisioned {
			profile_name: profile_name.to_string(),
			kind,
			address,
			client_config: client_config::render(&self.config, address, &keypair.private_key),
			file_name: client_config::file_name(profile_name),
			private_key: keypair.private_key,
		})
	}

	/// Revokes a profile: removes its stanza from the artifact and
	/// soft-deletes the record. A stanza already gone from the artifact is
	/// drift, not an error, so a re-run after a partial failure converges.
	#[instrument(skip(self), fields(%owner_id, %profile_name))]
	pub async fn revoke(&self, owner_id: &str, profile_name: &str) -> Result<()> {
		let _commit = self.commit_lock.lock().await;

		let row = self
			.repo
			.find_active_by_owner_and_name(owner_id, profile_name)
			.await?
			.ok_or_else(|| EngineError::ProfileNotFound(profile_name.to_string()))?;
		let profile = Profile::try_from(row)?;

		let mut doc = self.mutator.load().await?;
		match self.mutator.remove_peer(&mut doc, &profile.public_key).await {
			Ok(()) => {}
			Err(EngineError::PeerNotFound) => {
				warn!("peer stanza already absent, deactivating record anyway");
			}
			Err(e) => return Err(e),
		}

		self.repo.deactivate(profile.id).await?;

		info!(address = %profile.address, "profile revoked");
		Ok(())
	}

	#[instrument(skip(self), fields(%owner_id))]
	pub async fn list_active(&self, owner_id: &str) -> Result<Vec<ProfileSummary>> {
		self.repo
			.list_active_for_owner(owner_id)
			.await?
			.into_iter()
			.map(|row| Profile::try_from(row).map(ProfileSummary::from))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(kind: &str, address: &str, created_at: &str) -> ProfileRowTuple {
		(
			Uuid::new_v4().to_string(),
			"owner-1".to_string(),
			"owner-1-laptop".to_string(),
			kind.to_string(),
			"pub=".to_string(),
			"priv=".to_string(),
			address.to_string(),
			created_at.to_string(),
		)
	}

	#[test]
	fn row_conversion_parses_every_field() {
		let profile = Profile::try_from(row("personal", "10.8.100.1", "2025-06-01 12:30:00")).unwrap();

		assert_eq!(profile.kind, ProfileKind::Personal);
		assert_eq!(profile.address, "10.8.100.1".parse::<Ipv4Addr>().unwrap());
		assert_eq!(
			profile.created_at,
			Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()
		);
	}

	#[test]
	fn rfc3339_timestamps_are_accepted() {
		let profile = Profile::try_from(row("website", "10.8.10.1", "2025-06-01T12:30:00Z")).unwrap();
		assert_eq!(
			profile.created_at,
			Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()
		);
	}

	#[test]
	fn corrupt_rows_are_rejected() {
		assert!(Profile::try_from(row("corporate", "10.8.10.1", "2025-06-01 12:30:00")).is_err());
		assert!(Profile::try_from(row("website", "not-an-ip", "2025-06-01 12:30:00")).is_err());
		assert!(Profile::try_from(row("website", "10.8.10.1", "yesterday")).is_err());
	}

	#[test]
	fn debug_never_leaks_private_keys() {
		let profile = Profile::try_from(row("website", "10.8.10.1", "2025-06-01 12:30:00")).unwrap();
		assert!(!format!("{profile:?}").contains("priv="));

		let provisioned = Provisioned {
			profile_name: "owner-1-laptop".to_string(),
			kind: ProfileKind::Website,
			address: "10.8.10.1".parse().unwrap(),
			private_key: "priv=".to_string(),
			client_config: "PrivateKey = priv=".to_string(),
			file_name: "owner-1-laptop.conf".to_string(),
		};
		assert!(!format!("{provisioned:?}").contains("priv="));
	}
}
