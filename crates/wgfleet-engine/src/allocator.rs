// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::{debug, instrument};
use wgfleet_confdoc::StanzaDocument;
use wgfleet_db::ProfileRepository;

use crate::error::{EngineError, Result};
use crate::pools::{AddressPools, ProfileKind};

/// Merges the two sources of truth into the set of addresses that must not
/// be handed out: active allocation records plus every address observed
/// live in the artifact, whether or not the database knows about it.
/// Unparseable entries from either source are skipped.
pub fn merge_usage<I>(active: I, doc: &StanzaDocument) -> HashSet<Ipv4Addr>
where
	I: IntoIterator<Item = String>,
{
	let mut used: HashSet<Ipv4Addr> = active
		.into_iter()
		.filter_map(|address| address.parse().ok())
		.collect();
	used.extend(doc.observed_addresses());
	used
}

/// First-fit address allocation over the per-kind pools, reconciled
/// against the live artifact.
pub struct Allocator {
	pools: AddressPools,
	repo: ProfileRepository,
}

impl Allocator {
	pub fn new(pools: AddressPools, repo: ProfileRepository) -> Self {
		Self { pools, repo }
	}

	/// Returns the first free address of the kind's pool.
	///
	/// Candidates that pass the broad usage view get a narrow re-check
	/// against active records immediately before being returned; losing
	/// that check moves the scan to the next candidate, never back to the
	/// start. The re-check narrows the window between scanning and the
	/// caller's commit; the caller still owns serialization of the full
	/// allocate-then-commit sequence.
	#[instrument(skip(self, doc), fields(%kind))]
	pub async fn allocate(&self, kind: ProfileKind, doc: &StanzaDocument) -> Result<Ipv4Addr> {
		let used = merge_usage(self.repo.active_addresses().await?, doc);

		for candidate in self.pools.addresses(kind) {
			if used.contains(&candidate) {
				continue;
			}
			if self.repo.is_address_active(&candidate.to_string()).await? {
				continue;
			}

			debug!(address = %candidate, "allocated address");
			return Ok(candidate);
		}

		Err(EngineError::NoAddressAvailable(kind))
	}
}
