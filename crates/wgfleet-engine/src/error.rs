// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::pools::ProfileKind;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	/// The artifact does not exist at all. Never auto-repaired; the
	/// interface definition lives outside this engine.
	#[error("wireguard config document missing")]
	DocumentMissing,

	#[error("no address available in the {0} pool")]
	NoAddressAvailable(ProfileKind),

	#[error("no peer stanza matches the public key")]
	PeerNotFound,

	#[error("failed to persist wireguard config: {0}")]
	Persistence(String),

	#[error("failed to signal wireguard reload: {0}")]
	Reload(String),

	#[error("key generation failed: {0}")]
	Keygen(String),

	#[error("profile not found: {0}")]
	ProfileNotFound(String),

	#[error("profile name already in use: {0}")]
	ProfileExists(String),

	#[error("profile limit reached ({0})")]
	ProfileLimit(usize),

	#[error("database error: {0}")]
	Db(#[from] wgfleet_db::DbError),

	#[error("internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
