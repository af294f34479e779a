// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use base64::prelude::*;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{instrument, trace, warn};

use crate::error::{EngineError, Result};

/// A freshly generated WireGuard key pair, base64-encoded.
#[derive(Clone)]
pub struct WgKeyPair {
	pub private_key: String,
	pub public_key: String,
}

impl fmt::Debug for WgKeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgKeyPair")
			.field("private_key", &"<redacted>")
			.field("public_key", &self.public_key)
			.finish()
	}
}

/// Privileged operations delegated to the host's WireGuard tooling.
#[async_trait]
pub trait WgRuntime: Send + Sync {
	async fn generate_keypair(&self) -> Result<WgKeyPair>;

	/// Asks the running daemon to pick up the persisted configuration.
	/// Best-effort: the artifact on disk stays authoritative either way.
	async fn reload(&self) -> Result<()>;
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
	#[error("timed out after {0:?}")]
	Timeout(Duration),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("exited with {status}: {stderr}")]
	Failed {
		status: std::process::ExitStatus,
		stderr: String,
	},
}

/// Implementation shelling out to `wg` / `wg-quick`.
pub struct CommandWgRuntime {
	interface: String,
	timeout: Duration,
}

impl CommandWgRuntime {
	pub fn new(interface: impl Into<String>, timeout: Duration) -> Self {
		Self {
			interface: interface.into(),
			timeout,
		}
	}

	async fn run(
		&self,
		program: &str,
		args: &[&str],
		stdin: Option<&str>,
	) -> std::result::Result<String, CommandError> {
		let mut cmd = Command::new(program);
		cmd.args(args)
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			// A timed-out privileged child must not outlive its deadline.
			.kill_on_drop(true);
		if stdin.is_some() {
			cmd.stdin(Stdio::piped());
		}

		trace!(cmd = %format!("{program} {}", args.join(" ")), "running command");

		let run = async {
			let mut child = cmd.spawn()?;
			if let Some(input) = stdin {
				if let Some(mut pipe) = child.stdin.take() {
					use tokio::io::AsyncWriteExt;
					pipe.write_all(input.as_bytes()).await?;
					// Closing stdin lets wg pubkey terminate.
					drop(pipe);
				}
			}
			child.wait_with_output().await
		};

		let output = timeout(self.timeout, run)
			.await
			.map_err(|_| CommandError::Timeout(self.timeout))??;

		if output.status.success() {
			Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
		} else {
			Err(CommandError::Failed {
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
			})
		}
	}
}

#[async_trait]
impl WgRuntime for CommandWgRuntime {
	#[instrument(skip(self))]
	async fn generate_keypair(&self) -> Result<WgKeyPair> {
		let private_key = self
			.run("wg", &["genkey"], None)
			.await
			.map_err(|e| EngineError::Keygen(e.to_string()))?;

		let public_key = self
			.run("wg", &["pubkey"], Some(&private_key))
			.await
			.map_err(|e| EngineError::Keygen(e.to_string()))?;

		if !is_valid_key(&private_key) || !is_valid_key(&public_key) {
			return Err(EngineError::Keygen("wg returned a malformed key".to_string()));
		}

		Ok(WgKeyPair {
			private_key,
			public_key,
		})
	}

	#[instrument(skip(self), fields(interface = %self.interface))]
	async fn reload(&self) -> Result<()> {
		// Strip-and-sync applies peer changes without tearing the
		// interface down. Process substitution needs bash.
		let script = format!(
			"wg syncconf {interface} <(wg-quick strip {interface})",
			interface = self.interface
		);

		match self.run("sudo", &["bash", "-c", &script], None).await {
			Ok(_) => Ok(()),
			Err(e) => {
				warn!(error = %e, "wireguard reload command failed");
				Err(EngineError::Reload(e.to_string()))
			}
		}
	}
}

/// WireGuard keys are base64 of exactly 32 bytes.
pub fn is_valid_key(key: &str) -> bool {
	BASE64_STANDARD
		.decode(key)
		.map(|bytes| bytes.len() == 32)
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn valid_key_is_32_base64_bytes() {
		let key = BASE64_STANDARD.encode([7u8; 32]);
		assert!(is_valid_key(&key));
	}

	#[test]
	fn invalid_keys_are_rejected() {
		assert!(!is_valid_key(""));
		assert!(!is_valid_key("not base64 at all!!"));
		// Right alphabet, wrong length.
		assert!(!is_valid_key(&BASE64_STANDARD.encode([7u8; 16])));
	}

	#[test]
	fn keypair_debug_redacts_private_key() {
		let pair = WgKeyPair {
			private_key: "secret=".to_string(),
			public_key: "public=".to_string(),
		};

		let rendered = format!("{pair:?}");
		assert!(!rendered.contains("secret="));
		assert!(rendered.contains("public="));
	}

	#[tokio::test]
	async fn command_timeout_is_bounded() {
		let runtime = CommandWgRuntime::new("wg0", Duration::from_millis(50));

		let result = runtime.run("sleep", &["5"], None).await;
		assert!(matches!(result, Err(CommandError::Timeout(_))));
	}

	#[tokio::test]
	async fn missing_program_is_io_error() {
		let runtime = CommandWgRuntime::new("wg0", Duration::from_secs(1));

		let result = runtime.run("definitely-not-a-real-binary", &[], None).await;
		assert!(matches!(result, Err(CommandError::Io(_))));
	}
}
