// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::config::ConfigError;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// The two-way profile classification deciding which address pool an
/// allocation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
	Personal,
	Website,
}

impl ProfileKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProfileKind::Personal => "personal",
			ProfileKind::Website => "website",
		}
	}
}

impl fmt::Display for ProfileKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProfileKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"personal" => Ok(ProfileKind::Personal),
			"website" => Ok(ProfileKind::Website),
			other => Err(ConfigError::UnknownProfileKind(other.to_string())),
		}
	}
}

/// Immutable address pools, one per profile kind.
///
/// Each pool is an ordered sequence of disjoint blocks; the two pools
/// never overlap, a static invariant validated once at construction.
#[derive(Debug, Clone)]
pub struct AddressPools {
	personal: Vec<Ipv4Net>,
	website: Vec<Ipv4Net>,
}

impl AddressPools {
	pub fn new(personal: Vec<Ipv4Net>, website: Vec<Ipv4Net>) -> Result<Self, ConfigError> {
		for p in &personal {
			for w in &website {
				if p.contains(w) || w.contains(p) {
					return Err(ConfigError::OverlappingPools {
						personal: *p,
						website: *w,
					});
				}
			}
		}
		Ok(Self { personal, website })
	}

	/// Production ranges: website `10.8.10.0/24 ..= 10.8.25.0/24`,
	/// personal `10.8.100.0/24 ..= 10.8.255.0/24`.
	pub fn standard() -> Self {
		let website = (10u8..=25).map(third_octet_block).collect();
		let personal = (100u8..=255).map(third_octet_block).collect();
		// Disjoint by construction; new() re-validates the invariant.
		Self::new(personal, website).unwrap()
	}

	/// Usable host addresses of the kind's pool in ascending numeric
	/// order, lazily expanded; network and broadcast addresses of each
	/// block are excluded.
	pub fn addresses(&self, kind: ProfileKind) -> impl Iterator<Item = Ipv4Addr> + '_ {
		self.blocks(kind).iter().flat_map(|net| net.hosts())
	}

	fn blocks(&self, kind: ProfileKind) -> &[Ipv4Net] {
		match kind {
			ProfileKind::Personal => &self.personal,
			ProfileKind::Website => &self.website,
		}
	}
}

fn third_octet_block(third: u8) -> Ipv4Net {
	// Prefix length 24 is always valid.
	Ipv4Net::new(Ipv4Addr::new(10, 8, third, 0), 24).unwrap()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn kind_round_trip() {
		assert_eq!("personal".parse::<ProfileKind>().unwrap(), ProfileKind::Personal);
		assert_eq!("website".parse::<ProfileKind>().unwrap(), ProfileKind::Website);
		assert!("corporate".parse::<ProfileKind>().is_err());
		assert_eq!(ProfileKind::Website.to_string(), "website");
	}

	#[test]
	fn kind_serializes_lowercase() {
		assert_eq!(
			serde_json::to_string(&ProfileKind::Personal).unwrap(),
			"\"personal\""
		);
		let kind: ProfileKind = serde_json::from_str("\"website\"").unwrap();
		assert_eq!(kind, ProfileKind::Website);
	}

	#[test]
	fn standard_pools_first_addresses() {
		let pools = AddressPools::standard();

		assert_eq!(
			pools.addresses(ProfileKind::Website).next(),
			Some("10.8.10.1".parse().unwrap())
		);
		assert_eq!(
			pools.addresses(ProfileKind::Personal).next(),
			Some("10.8.100.1".parse().unwrap())
		);
	}

	#[test]
	fn blocks_exclude_network_and_broadcast() {
		let pools = AddressPools::standard();
		let first_block: Vec<Ipv4Addr> = pools
			.addresses(ProfileKind::Website)
			.take(255)
			.collect();

		assert_eq!(first_block.len(), 255);
		assert_eq!(first_block[0], "10.8.10.1".parse::<Ipv4Addr>().unwrap());
		assert_eq!(first_block[253], "10.8.10.254".parse::<Ipv4Addr>().unwrap());
		// The scan crosses into the next block without emitting .0 or .255.
		assert_eq!(first_block[254], "10.8.11.1".parse::<Ipv4Addr>().unwrap());
	}

	#[test]
	fn addresses_are_ascending() {
		let pools = AddressPools::standard();
		let sample: Vec<Ipv4Addr> = pools.addresses(ProfileKind::Personal).take(1000).collect();
		assert!(sample.windows(2).all(|pair| pair[0] < pair[1]));
	}

	#[test]
	fn standard_pools_are_disjoint() {
		let pools = AddressPools::standard();
		let website: HashSet<Ipv4Addr> = pools.addresses(ProfileKind::Website).collect();
		assert_eq!(website.len(), 16 * 254);

		assert!(pools
			.addresses(ProfileKind::Personal)
			.all(|addr| !website.contains(&addr)));
	}

	#[test]
	fn overlapping_pools_are_rejected() {
		let shared: Ipv4Net = "10.8.10.0/24".parse().unwrap();
		let wider: Ipv4Net = "10.8.0.0/16".parse().unwrap();

		assert!(AddressPools::new(vec![shared], vec![shared]).is_err());
		assert!(AddressPools::new(vec![shared], vec![wider]).is_err());
		assert!(AddressPools::new(
			vec!["10.8.100.0/24".parse().unwrap()],
			vec![shared]
		)
		.is_ok());
	}
}
