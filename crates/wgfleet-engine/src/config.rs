// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::Ipv4Net;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("missing environment variable: {0}")]
	MissingEnv(String),

	#[error("parse error: {0}")]
	Parse(String),

	#[error("unknown profile kind: {0}")]
	UnknownProfileKind(String),

	#[error("address pools overlap: {personal} and {website}")]
	OverlappingPools { personal: Ipv4Net, website: Ipv4Net },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Path of the live artifact consumed by the daemon.
	pub wg_config_path: PathBuf,
	pub interface: String,
	/// Public endpoint handed to clients.
	pub server_endpoint: String,
	pub server_port: u16,
	pub server_public_key: String,
	pub dns: String,
	pub client_allowed_ips: String,
	pub persistent_keepalive: u16,
	pub max_profiles_per_owner: usize,
	/// Bound on every external invocation (keypair generation, reload).
	pub command_timeout: Duration,
}

impl EngineConfig {
	pub fn new(server_endpoint: impl Into<String>, server_public_key: impl Into<String>) -> Self {
		Self {
			wg_config_path: PathBuf::from("/etc/wireguard/wg0.conf"),
			interface: "wg0".to_string(),
			server_endpoint: server_endpoint.into(),
			server_port: 51820,
			server_public_key: server_public_key.into(),
			dns: "10.8.0.1".to_string(),
			client_allowed_ips: "10.8.0.0/16".to_string(),
			persistent_keepalive: 25,
			max_profiles_per_owner: 5,
			command_timeout: Duration::from_secs(10),
		}
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		let server_endpoint = std::env::var("WGFLEET_SERVER_ENDPOINT")
			.map_err(|_| ConfigError::MissingEnv("WGFLEET_SERVER_ENDPOINT".to_string()))?;

		let server_public_key = std::env::var("WGFLEET_SERVER_PUBLIC_KEY")
			.map_err(|_| ConfigError::MissingEnv("WGFLEET_SERVER_PUBLIC_KEY".to_string()))?;

		let mut config = Self::new(server_endpoint, server_public_key);

		if let Ok(path) = std::env::var("WGFLEET_WG_CONFIG") {
			config.wg_config_path = PathBuf::from(path);
		}

		if let Ok(interface) = std::env::var("WGFLEET_WG_INTERFACE") {
			config.interface = interface;
		}

		if let Ok(port) = std::env::var("WGFLEET_SERVER_PORT") {
			config.server_port = port
				.parse()
				.map_err(|e| ConfigError::Parse(format!("invalid WGFLEET_SERVER_PORT: {e}")))?;
		}

		if let Ok(dns) = std::env::var("WGFLEET_CLIENT_DNS") {
			config.dns = dns;
		}

		if let Ok(allowed) = std::env::var("WGFLEET_CLIENT_ALLOWED_IPS") {
			config.client_allowed_ips = allowed;
		}

		config.persistent_keepalive = std::env::var("WGFLEET_KEEPALIVE_SECS")
			.ok()
			.and_then(|s| s.parse().ok())
			.unwrap_or(config.persistent_keepalive);

		config.max_profiles_per_owner = std::env::var("WGFLEET_MAX_PROFILES")
			.ok()
			.and_then(|s| s.parse().ok())
			.unwrap_or(config.max_profiles_per_owner);

		config.command_timeout = std::env::var("WGFLEET_COMMAND_TIMEOUT_SECS")
			.ok()
			.and_then(|s| s.parse().ok())
			.map(Duration::from_secs)
			.unwrap_or(config.command_timeout);

		Ok(config)
	}
}
