// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};

const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-file access to the live WireGuard configuration artifact.
///
/// The artifact is shared with the running daemon and may be edited
/// out-of-band; implementations must never expose a partially written
/// state to any reader.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
	/// Full contents of the artifact. Fails with
	/// [`EngineError::DocumentMissing`] when it does not exist at all
	/// (distinct from exists-but-empty).
	async fn read(&self) -> Result<String>;

	/// Atomically replaces the whole artifact.
	async fn replace(&self, contents: &str) -> Result<()>;

	async fn exists(&self) -> bool;
}

/// Artifact store backed by a file at a well-known path.
///
/// Replacement writes a sibling temp file and renames it into place so an
/// interrupted process never leaves a partially written artifact behind.
pub struct FileArtifactStore {
	path: PathBuf,
}

impl FileArtifactStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn tmp_path(&self) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|n| n.to_os_string())
			.unwrap_or_else(|| "wg.conf".into());
		name.push(".tmp");
		self.path.with_file_name(name)
	}
}

async fn write_tmp(tmp: &Path, contents: &str) -> std::io::Result<()> {
	#[cfg(unix)]
	{
		use tokio::io::AsyncWriteExt;

		// The artifact carries key material; match wg's 0600.
		let mut file = tokio::fs::OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(tmp)
			.await?;
		file.write_all(contents.as_bytes()).await?;
	}

	#[cfg(not(unix))]
	{
		tokio::fs::write(tmp, contents).await?;
	}

	Ok(())
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
	#[instrument(skip(self), fields(path = %self.path.display()))]
	async fn read(&self) -> Result<String> {
		let read = timeout(IO_TIMEOUT, tokio::fs::read_to_string(&self.path))
			.await
			.map_err(|_| EngineError::Persistence(format!("timed out reading {}", self.path.display())))?;

		read.map_err(|e| {
			if e.kind() == ErrorKind::NotFound {
				EngineError::DocumentMissing
			} else {
				EngineError::Persistence(format!("failed to read {}: {e}", self.path.display()))
			}
		})
	}

	#[instrument(skip(self, contents), fields(path = %self.path.display(), bytes = contents.len()))]
	async fn replace(&self, contents: &str) -> Result<()> {
		let tmp = self.tmp_path();

		let replace = async {
			write_tmp(&tmp, contents).await?;
			tokio::fs::rename(&tmp, &self.path).await
		};

		timeout(IO_TIMEOUT, replace)
			.await
			.map_err(|_| EngineError::Persistence(format!("timed out replacing {}", self.path.display())))?
			.map_err(|e| {
				EngineError::Persistence(format!("failed to replace {}: {e}", self.path.display()))
			})?;

		debug!("artifact replaced");
		Ok(())
	}

	async fn exists(&self) -> bool {
		tokio::fs::try_exists(&self.path).await.unwrap_or(false)
	}
}
