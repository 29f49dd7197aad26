//! On-disk file share store.
//!
//! Files live flat in the upload directory; each stored file has a hidden
//! `.{name}.json` sidecar carrying its metadata, including the optional
//! per-file password hash. This is plain I/O glue around the auth core;
//! the core only contributes the hash/verify primitives.
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ShareError;

/// Retention for files uploaded without an explicit expiration.
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Metadata stored in a file's sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub description: String,
    pub original_filename: String,
    pub uploader_addr: String,
    pub upload_time: SystemTime,
    pub expiration_time: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl FileMetadata {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expiration_time
    }
}

/// One row of the public file listing. The password hash never leaves the
/// store; listings only say whether a password is required.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub original_filename: String,
    pub description: String,
    pub size: u64,
    pub has_password: bool,
}

#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store a file and its metadata sidecar; returns the stored name.
    pub async fn save(
        &self,
        original: &str,
        data: &[u8],
        meta: FileMetadata,
    ) -> Result<String, ShareError> {
        let base = Path::new(original)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");
        let tag = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u32);
        let stored = format!("{tag:08x}_{base}");

        fs::write(self.root.join(&stored), data).await?;
        fs::write(self.meta_path(&stored), serde_json::to_vec_pretty(&meta)?).await?;
        Ok(stored)
    }

    /// Metadata for a stored file. A file without a sidecar (dropped into
    /// the directory out of band) gets defaults: no password, expiry at
    /// modification time plus the default retention.
    pub async fn metadata(&self, stored: &str) -> Result<FileMetadata, ShareError> {
        let path = self.checked_path(stored)?;
        let fs_meta = fs::metadata(&path).await.map_err(|_| ShareError::NotFound)?;
        if !fs_meta.is_file() {
            return Err(ShareError::NotFound);
        }

        if let Ok(bytes) = fs::read(self.meta_path(stored)).await {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let modified = fs_meta.modified().unwrap_or_else(|_| SystemTime::now());
        Ok(FileMetadata {
            description: String::new(),
            original_filename: stored.to_string(),
            uploader_addr: String::new(),
            upload_time: modified,
            expiration_time: modified + DEFAULT_RETENTION,
            password_hash: None,
        })
    }

    /// Read a stored file's contents.
    pub async fn read(&self, stored: &str) -> Result<Vec<u8>, ShareError> {
        let path = self.checked_path(stored)?;
        fs::read(&path).await.map_err(|_| ShareError::NotFound)
    }

    /// Unexpired files, newest first.
    pub async fn list(&self) -> Result<Vec<FileEntry>, ShareError> {
        let now = SystemTime::now();
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name.ends_with(".part") {
                continue;
            }
            let Ok(fs_meta) = entry.metadata().await else {
                continue;
            };
            if !fs_meta.is_file() {
                continue;
            }
            let Ok(meta) = self.metadata(&name).await else {
                continue;
            };
            if meta.is_expired(now) {
                continue;
            }
            entries.push((
                meta.upload_time,
                FileEntry {
                    filename: name,
                    has_password: meta.has_password(),
                    original_filename: meta.original_filename,
                    description: meta.description,
                    size: fs_meta.len(),
                },
            ));
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Remove a stored file and its sidecar.
    pub async fn delete(&self, stored: &str) -> Result<(), ShareError> {
        let path = self.checked_path(stored)?;
        fs::remove_file(&path)
            .await
            .map_err(|_| ShareError::NotFound)?;
        let _ = fs::remove_file(self.meta_path(stored)).await;
        Ok(())
    }

    /// Remove every expired file. Returns how many were deleted.
    pub async fn sweep_expired(&self) -> Result<usize, ShareError> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name.ends_with(".part") {
                continue;
            }
            let Ok(meta) = self.metadata(&name).await else {
                continue;
            };
            if meta.is_expired(now) && self.delete(&name).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn meta_path(&self, stored: &str) -> PathBuf {
        self.root.join(format!(".{stored}.json"))
    }

    /// Reject path traversal and sidecar access before touching the disk.
    fn checked_path(&self, stored: &str) -> Result<PathBuf, ShareError> {
        if stored.is_empty()
            || stored.starts_with('.')
            || stored.contains("..")
            || stored.contains('/')
            || stored.contains('\\')
        {
            return Err(ShareError::InvalidFilename);
        }
        Ok(self.root.join(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(original: &str, password_hash: Option<String>) -> FileMetadata {
        let now = SystemTime::now();
        FileMetadata {
            description: "test file".to_string(),
            original_filename: original.to_string(),
            uploader_addr: "192.0.2.1".to_string(),
            upload_time: now,
            expiration_time: now + Duration::from_secs(3600),
            password_hash,
        }
    }

    #[tokio::test]
    async fn save_and_metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let stored = store
            .save("notes.txt", b"hello", meta("notes.txt", Some("hash".to_string())))
            .await
            .unwrap();
        assert!(stored.ends_with("_notes.txt"));

        let loaded = store.metadata(&stored).await.unwrap();
        assert_eq!(loaded.original_filename, "notes.txt");
        assert_eq!(loaded.password_hash.as_deref(), Some("hash"));
        assert!(loaded.has_password());

        assert_eq!(store.read(&stored).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn save_strips_path_components_from_the_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let stored = store
            .save("../../etc/passwd", b"data", meta("passwd", None))
            .await
            .unwrap();
        assert!(stored.ends_with("_passwd"));
        assert!(store.read(&stored).await.is_ok());
    }

    #[tokio::test]
    async fn traversal_and_sidecar_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        for name in ["../secret", "a/b", "a\\b", ".hidden.json", ""] {
            assert!(matches!(
                store.read(name).await,
                Err(ShareError::InvalidFilename)
            ));
        }
    }

    #[tokio::test]
    async fn list_skips_sidecars_and_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let live = store.save("live.txt", b"live", meta("live.txt", None)).await.unwrap();

        let mut expired_meta = meta("old.txt", None);
        expired_meta.expiration_time = SystemTime::now() - Duration::from_secs(1);
        store.save("old.txt", b"old", expired_meta).await.unwrap();

        let listing = store.list().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].filename, live);
        assert_eq!(listing[0].original_filename, "live.txt");
        assert!(!listing[0].has_password);
    }

    #[tokio::test]
    async fn delete_removes_file_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let stored = store.save("gone.txt", b"x", meta("gone.txt", None)).await.unwrap();
        store.delete(&stored).await.unwrap();

        assert!(matches!(store.read(&stored).await, Err(ShareError::NotFound)));
        assert!(!dir.path().join(format!(".{stored}.json")).exists());

        // deleting again reports not found rather than erroring fatally
        assert!(matches!(
            store.delete(&stored).await,
            Err(ShareError::NotFound)
        ));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let live = store.save("live.txt", b"live", meta("live.txt", None)).await.unwrap();
        let mut expired_meta = meta("old.txt", None);
        expired_meta.expiration_time = SystemTime::now() - Duration::from_secs(1);
        let expired = store.save("old.txt", b"old", expired_meta).await.unwrap();

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(store.read(&live).await.is_ok());
        assert!(matches!(store.read(&expired).await, Err(ShareError::NotFound)));
    }

    #[tokio::test]
    async fn orphan_files_get_default_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("dropped.bin"), b"raw").unwrap();
        let meta = store.metadata("dropped.bin").await.unwrap();

        assert_eq!(meta.original_filename, "dropped.bin");
        assert!(!meta.has_password());
        assert!(!meta.is_expired(SystemTime::now()));
    }
}
