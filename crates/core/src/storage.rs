//! Vault storage for attachments.
//!
//! Paths handed to [`Storage`] are vault-relative and already normalized
//! (see [`crate::filename::normalize_path`]).

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// Write access to the vault.
pub trait Storage {
    /// Creates a directory.
    ///
    /// An existing directory must surface as [`io::ErrorKind::AlreadyExists`]
    /// rather than success; callers decide whether that is an error.
    fn create_dir(&self, path: &str) -> impl Future<Output = io::Result<()>> + Send;

    /// Writes a binary file, replacing any existing file at `path`.
    fn write_bytes(&self, path: &str, bytes: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

/// [`Storage`] backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for FsStorage {
    async fn create_dir(&self, path: &str) -> io::Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::create_dir(&target).await
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.resolve(path), bytes).await
    }
}
