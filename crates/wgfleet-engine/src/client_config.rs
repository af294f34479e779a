// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use crate::config::EngineConfig;

/// Renders the per-client tunnel configuration handed to the end user.
///
/// The layout is deliberately fixed: existing client imports depend on it
/// byte for byte, so any change here is a compatibility break.
pub fn render(config: &EngineConfig, address: Ipv4Addr, private_key: &str) -> String {
	format!(
		"[Interface]\n\
		 Address = {address}/24\n\
		 PrivateKey = {private_key}\n\
		 DNS = {dns}\n\
		 \n\
		 [Peer]\n\
		 PublicKey = {server_public_key}\n\
		 Endpoint = {endpoint}:{port}\n\
		 AllowedIPs = {allowed_ips}\n\
		 PersistentKeepalive = {keepalive}\n",
		dns = config.dns,
		server_public_key = config.server_public_key,
		endpoint = config.server_endpoint,
		port = config.server_port,
		allowed_ips = config.client_allowed_ips,
		keepalive = config.persistent_keepalive,
	)
}

/// Suggested download name for a rendered configuration.
pub fn file_name(profile_name: &str) -> String {
	format!("{profile_name}.conf")
}
