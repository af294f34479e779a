// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed document model and codec for WireGuard peer configuration files.
//!
//! A `wg0.conf`-style file is modelled as an opaque preamble (the interface
//! section, held verbatim and never interpreted) followed by an ordered
//! sequence of blocks: `[Peer]` stanzas plus any other bracketed sections,
//! kept verbatim. Parsing is total: content the codec does not understand
//! is preserved and written back unchanged.

pub mod codec;
pub mod document;

pub use codec::{parse, serialize};
pub use document::{Block, PeerStanza, StanzaDocument, StanzaEntry};
