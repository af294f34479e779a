// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use wgfleet_confdoc::{parse, serialize, PeerStanza, StanzaDocument};

use crate::artifact::ArtifactStore;
use crate::error::{EngineError, Result};
use crate::system::WgRuntime;

/// Applies structural peer edits to the live configuration artifact.
///
/// Every mutation is a load, an in-memory edit, and one atomic whole-file
/// replace, followed by a best-effort reload signal to the daemon. A
/// failed reload is logged and swallowed: the artifact on disk is already
/// correct and the daemon converges on its next restart.
pub struct PeerMutator {
	store: Arc<dyn ArtifactStore>,
	runtime: Arc<dyn WgRuntime>,
}

impl PeerMutator {
	pub fn new(store: Arc<dyn ArtifactStore>, runtime: Arc<dyn WgRuntime>) -> Self {
		Self { store, runtime }
	}

	/// Parses the current artifact. Fails with
	/// [`EngineError::DocumentMissing`] when the file does not exist;
	/// the interface definition is owned elsewhere and never auto-created.
	pub async fn load(&self) -> Result<StanzaDocument> {
		Ok(parse(&self.store.read().await?))
	}

	/// Appends a labelled peer stanza and persists the document.
	#[instrument(skip(self, doc, public_key), fields(label = %label, address = %address))]
	pub async fn add_peer(
		&self,
		doc: &mut StanzaDocument,
		label: &str,
		public_key: &str,
		address: Ipv4Addr,
	) -> Result<()> {
		doc.push_peer(PeerStanza::peer(label, public_key, address));
		self.persist(doc).await?;
		info!("peer stanza appended");

		self.signal_reload().await;
		Ok(())
	}

	/// Removes the stanza matching `public_key` and persists the document.
	/// Nothing is written when no stanza matches.
	#[instrument(skip(self, doc, public_key))]
	pub async fn remove_peer(&self, doc: &mut StanzaDocument, public_key: &str) -> Result<()> {
		let removed = doc.remove_peer(public_key).ok_or(EngineError::PeerNotFound)?;
		self.persist(doc).await?;
		info!(label = removed.comment.as_deref().unwrap_or(""), "peer stanza removed");

		self.signal_reload().await;
		Ok(())
	}

	async fn persist(&self, doc: &StanzaDocument) -> Result<()> {
		self.store.replace(&serialize(doc)).await
	}

	async fn signal_reload(&self) {
		if let Err(e) = self.runtime.reload().await {
			warn!(error = %e, "wireguard reload failed, config persisted anyway");
		}
	}
}
