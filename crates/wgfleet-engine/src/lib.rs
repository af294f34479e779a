// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Address allocation and peer configuration reconciliation engine.
//!
//! Provisions and revokes VPN client identities while keeping two
//! independent stores of truth consistent: the relational allocation
//! records in [`wgfleet_db`] and the live `wg0.conf` artifact consumed by
//! the WireGuard daemon, which a privileged external process may mutate
//! out-of-band.
//!
//! # Overview
//!
//! 1. [`pools`] defines the two disjoint address pools, one per
//!    [`ProfileKind`].
//! 2. [`allocator`] merges active allocation records with addresses
//!    observed live in the artifact and hands out the first free address.
//! 3. [`mutator`] applies structural add/remove edits to the artifact via
//!    an atomic replace and signals the daemon to reload.
//! 4. [`service`] ties the pieces together behind the provisioning API and
//!    serializes every allocate-then-commit sequence behind one lock.

pub mod allocator;
pub mod artifact;
pub mod client_config;
pub mod config;
pub mod error;
pub mod mutator;
pub mod pools;
pub mod service;
pub mod system;

pub use allocator::{merge_usage, Allocator};
pub use artifact::{ArtifactStore, FileArtifactStore};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, Result};
pub use mutator::PeerMutator;
pub use pools::{AddressPools, ProfileKind};
pub use service::{Profile, ProfileSummary, ProvisionService, Provisioned};
pub use system::{CommandWgRuntime, WgKeyPair, WgRuntime};
