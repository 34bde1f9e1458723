//! Credential persistence.
//!
//! The bridge hands us opaque credential blobs; we keep the latest one as
//! `creds.json` inside a session directory. The blob's layout belongs to
//! the bridge, not to us.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;

use chat_relay_core::TransportError;

const CREDS_FILE: &str = "creds.json";

/// File-backed store for the transport credential blob.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the session directory if missing. Called once at startup;
    /// failure here is fatal to the process.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), TransportError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Load the stored credential blob, if any.
    ///
    /// A corrupt file is treated as absent (logged), which forces a fresh
    /// pairing cycle rather than wedging the reconnect loop.
    ///
    /// # Errors
    /// Returns an error on filesystem failure other than the file being
    /// missing.
    pub async fn load(&self) -> Result<Option<Value>, TransportError> {
        let path = self.dir.join(CREDS_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt credential file, ignoring");
                Ok(None)
            }
        }
    }

    /// Persist a credential blob, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the blob cannot be serialized or written.
    pub async fn store(&self, credentials: &Value) -> Result<(), TransportError> {
        let raw = serde_json::to_vec(credentials)
            .map_err(|e| TransportError::Credentials(e.to_string()))?;
        let path = self.dir.join(CREDS_FILE);
        // Write-then-rename so a crash mid-write never leaves a torn file.
        let tmp = self.dir.join(format!("{CREDS_FILE}.tmp"));
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Remove the stored credential blob. A missing file is fine.
    ///
    /// # Errors
    /// Returns an error on filesystem failure.
    pub async fn invalidate(&self) -> Result<(), TransportError> {
        let path = self.dir.join(CREDS_FILE);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        assert!(store.load().await.unwrap().is_none());

        let creds = json!({"noise_key": "abc", "registered": true});
        store.store(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(creds));
    }

    #[tokio::test]
    async fn invalidate_removes_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.store(&json!({"k": 1})).await.unwrap();
        store.invalidate().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        // Invalidating again is a no-op.
        store.invalidate().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        tokio::fs::write(dir.path().join("creds.json"), b"not json at all")
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_dir_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("a/b/session"));
        store.ensure_dir().await.unwrap();
        store.store(&json!({})).await.unwrap();
    }
}
