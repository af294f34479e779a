// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::document::{Block, PeerStanza, StanzaDocument, StanzaEntry, PEER_MARKER};

/// Parses raw text into a [`StanzaDocument`].
///
/// Parsing is total. Lines before the first block land in the preamble
/// verbatim; a comment line immediately preceding a marker attaches to
/// that stanza. Any bracketed section header ends the current block:
/// `[Peer]` opens a peer stanza, every other header opens a verbatim
/// [`Block::Section`] so peer edits cannot reach into unrelated sections.
/// A trailing `[Peer]` marker with no directives before end-of-input is
/// kept as an empty stanza rather than dropped.
pub fn parse(text: &str) -> StanzaDocument {
	let mut preamble: Vec<String> = Vec::new();
	let mut blocks: Vec<Block> = Vec::new();
	let mut current: Option<Block> = None;
	// A comment line may introduce the next stanza; held until the
	// following line decides.
	let mut pending_comment: Option<String> = None;

	for line in text.lines() {
		let trimmed = line.trim();

		if trimmed.starts_with('[') {
			if trimmed == PEER_MARKER {
				if let Some(block) = current.take() {
					close(block, &mut blocks);
				}
				current = Some(Block::Peer(PeerStanza {
					comment: pending_comment.take(),
					entries: Vec::new(),
				}));
			} else if current.is_none() && blocks.is_empty() {
				// Interface-level content before the first peer stanza.
				if let Some(previous) = pending_comment.take() {
					preamble.push(previous);
				}
				preamble.push(line.to_string());
			} else {
				if let Some(block) = current.take() {
					close(block, &mut blocks);
				}
				let mut lines = Vec::new();
				if let Some(previous) = pending_comment.take() {
					lines.push(previous);
				}
				lines.push(line.to_string());
				current = Some(Block::Section(lines));
			}
			continue;
		}

		if trimmed.starts_with('#') {
			if let Some(previous) = pending_comment.take() {
				keep_raw(&mut preamble, current.as_mut(), previous);
			}
			pending_comment = Some(line.to_string());
			continue;
		}

		if let Some(previous) = pending_comment.take() {
			keep_raw(&mut preamble, current.as_mut(), previous);
		}

		if trimmed.is_empty() {
			// Blank lines around peer stanzas are separators the
			// serializer reinserts; elsewhere whitespace is preserved.
			match current.as_mut() {
				None => preamble.push(line.to_string()),
				Some(Block::Section(lines)) => lines.push(line.to_string()),
				Some(Block::Peer(_)) => {}
			}
			continue;
		}

		match current.as_mut() {
			None => preamble.push(line.to_string()),
			Some(Block::Section(lines)) => lines.push(line.to_string()),
			Some(Block::Peer(stanza)) => match split_directive(trimmed) {
				Some((name, value)) => stanza.entries.push(StanzaEntry::Directive { name, value }),
				None => stanza.entries.push(StanzaEntry::Raw(line.to_string())),
			},
		}
	}

	if let Some(previous) = pending_comment.take() {
		keep_raw(&mut preamble, current.as_mut(), previous);
	}
	if let Some(block) = current.take() {
		close(block, &mut blocks);
	}

	StanzaDocument { preamble, blocks }
}

/// Serializes a document back to text: preamble verbatim, then each block
/// as a blank-line-separated unit. Untouched blocks re-serialize with
/// identical content; inter-block whitespace is normalized.
pub fn serialize(doc: &StanzaDocument) -> String {
	let mut out = String::new();

	for line in &doc.preamble {
		out.push_str(line);
		out.push('\n');
	}

	for block in &doc.blocks {
		if !out.is_empty() && !out.ends_with("\n\n") {
			out.push('\n');
		}
		match block {
			Block::Peer(stanza) => {
				if let Some(comment) = &stanza.comment {
					out.push_str(comment);
					out.push('\n');
				}
				out.push_str(PEER_MARKER);
				out.push('\n');
				for entry in &stanza.entries {
					match entry {
						StanzaEntry::Directive { name, value } => {
							out.push_str(name);
							out.push_str(" = ");
							out.push_str(value);
							out.push('\n');
						}
						StanzaEntry::Raw(line) => {
							out.push_str(line);
							out.push('\n');
						}
					}
				}
			}
			Block::Section(lines) => {
				for line in lines {
					out.push_str(line);
					out.push('\n');
				}
			}
		}
	}

	out
}

fn keep_raw(preamble: &mut Vec<String>, current: Option<&mut Block>, line: String) {
	match current {
		Some(Block::Peer(stanza)) => stanza.entries.push(StanzaEntry::Raw(line)),
		Some(Block::Section(lines)) => lines.push(line),
		None => preamble.push(line),
	}
}

fn close(block: Block, blocks: &mut Vec<Block>) {
	match block {
		Block::Section(mut lines) => {
			// Trailing blanks are inter-block separators the serializer
			// reinserts.
			while lines.last().map_or(false, |l| l.trim().is_empty()) {
				lines.pop();
			}
			blocks.push(Block::Section(lines));
		}
		peer => blocks.push(peer),
	}
}

/// Splits `Name = value` on the first `=`. Values may themselves contain
/// `=` (base64 key padding).
fn split_directive(line: &str) -> Option<(String, String)> {
	let (name, value) = line.split_once('=')?;
	let name = name.trim();
	if name.is_empty() {
		return None;
	}
	Some((name.to_string(), value.trim().to_string()))
}
