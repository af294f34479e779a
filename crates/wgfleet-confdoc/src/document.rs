// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

/// Section marker that opens a peer stanza.
pub const PEER_MARKER: &str = "[Peer]";

/// A parsed WireGuard server configuration file.
///
/// `preamble` holds every raw line preceding the first block (the
/// interface section, comments, blank lines) verbatim. Block order is
/// significant and preserved; new peer stanzas append at the end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StanzaDocument {
	pub preamble: Vec<String>,
	pub blocks: Vec<Block>,
}

/// One block after the preamble: a `[Peer]` stanza the engine
/// understands, or any other bracketed section held verbatim so peer
/// edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
	Peer(PeerStanza),
	Section(Vec<String>),
}

/// One `[Peer]` stanza: an optional leading comment line plus the stanza
/// body in original order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerStanza {
	pub comment: Option<String>,
	pub entries: Vec<StanzaEntry>,
}

/// A line within a peer stanza body. Lines that are not `name = value`
/// directives are kept verbatim so the codec never drops content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StanzaEntry {
	Directive { name: String, value: String },
	Raw(String),
}

impl PeerStanza {
	/// Canonical stanza for a newly provisioned peer.
	pub fn peer(label: &str, public_key: &str, address: Ipv4Addr) -> Self {
		Self {
			comment: Some(format!("# Profile: {label}")),
			entries: vec![
				StanzaEntry::Directive {
					name: "PublicKey".to_string(),
					value: public_key.to_string(),
				},
				StanzaEntry::Directive {
					name: "AllowedIPs".to_string(),
					value: format!("{address}/32"),
				},
			],
		}
	}

	/// First directive with the given name, matched case-insensitively.
	pub fn directive(&self, name: &str) -> Option<&str> {
		self.entries.iter().find_map(|entry| match entry {
			StanzaEntry::Directive { name: n, value } if n.eq_ignore_ascii_case(name) => {
				Some(value.as_str())
			}
			_ => None,
		})
	}

	pub fn public_key(&self) -> Option<&str> {
		self.directive("PublicKey")
	}

	/// The peer's assigned address, read from `AllowedIPs` with the mask
	/// stripped. `None` if the directive is absent or unparseable.
	pub fn allowed_address(&self) -> Option<Ipv4Addr> {
		let value = self.directive("AllowedIPs")?;
		let ip = value.split('/').next()?.trim();
		ip.parse().ok()
	}
}

impl StanzaDocument {
	/// Peer stanzas in document order, skipping verbatim sections.
	pub fn peers(&self) -> impl Iterator<Item = &PeerStanza> {
		self.blocks.iter().filter_map(|block| match block {
			Block::Peer(stanza) => Some(stanza),
			Block::Section(_) => None,
		})
	}

	pub fn push_peer(&mut self, stanza: PeerStanza) {
		self.blocks.push(Block::Peer(stanza));
	}

	/// Addresses observed live in the document, invalid entries skipped.
	pub fn observed_addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
		self.peers().filter_map(PeerStanza::allowed_address)
	}

	/// Removes the first peer stanza whose `PublicKey` matches exactly.
	///
	/// Duplicate keys are a data-integrity condition, not a parse error;
	/// only the first match is dropped and every other block keeps its
	/// position. Verbatim sections are never candidates.
	pub fn remove_peer(&mut self, public_key: &str) -> Option<PeerStanza> {
		let index = self.blocks.iter().position(|block| {
			matches!(block, Block::Peer(stanza) if stanza.public_key() == Some(public_key))
		})?;

		match self.blocks.remove(index) {
			Block::Peer(stanza) => Some(stanza),
			Block::Section(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonical_peer_stanza() {
		let stanza = PeerStanza::peer("alice-laptop", "pk123=", "10.8.10.1".parse().unwrap());

		assert_eq!(stanza.comment.as_deref(), Some("# Profile: alice-laptop"));
		assert_eq!(stanza.public_key(), Some("pk123="));
		assert_eq!(stanza.directive("allowedips"), Some("10.8.10.1/32"));
		assert_eq!(
			stanza.allowed_address(),
			Some("10.8.10.1".parse::<Ipv4Addr>().unwrap())
		);
	}

	#[test]
	fn allowed_address_tolerates_garbage() {
		let stanza = PeerStanza {
			comment: None,
			entries: vec![StanzaEntry::Directive {
				name: "AllowedIPs".to_string(),
				value: "not-an-ip/32".to_string(),
			}],
		};

		assert_eq!(stanza.allowed_address(), None);
	}

	#[test]
	fn remove_peer_drops_first_match_only() {
		let addr: Ipv4Addr = "10.8.10.1".parse().unwrap();
		let mut doc = StanzaDocument::default();
		doc.push_peer(PeerStanza::peer("a", "dup=", addr));
		doc.push_peer(PeerStanza::peer("b", "other=", addr));
		doc.push_peer(PeerStanza::peer("c", "dup=", addr));

		let removed = doc.remove_peer("dup=").unwrap();
		assert_eq!(removed.comment.as_deref(), Some("# Profile: a"));

		let peers: Vec<_> = doc.peers().collect();
		assert_eq!(peers.len(), 2);
		assert_eq!(peers[0].public_key(), Some("other="));
		assert_eq!(peers[1].public_key(), Some("dup="));
	}

	#[test]
	fn remove_peer_missing_key_is_none() {
		let mut doc = StanzaDocument::default();
		assert!(doc.remove_peer("absent=").is_none());
	}

	#[test]
	fn remove_peer_never_matches_verbatim_sections() {
		let mut doc = StanzaDocument::default();
		doc.blocks.push(Block::Section(vec![
			"[Interface]".to_string(),
			"PublicKey = dup=".to_string(),
		]));
		doc.push_peer(PeerStanza::peer("a", "dup=", "10.8.10.1".parse().unwrap()));

		let removed = doc.remove_peer("dup=").unwrap();
		assert_eq!(removed.comment.as_deref(), Some("# Profile: a"));
		assert_eq!(doc.blocks.len(), 1);
		assert!(matches!(&doc.blocks[0], Block::Section(lines) if lines[0] == "[Interface]"));
	}
}
