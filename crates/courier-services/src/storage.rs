//! Upload persistence
//!
//! Files land directly under a single root directory. A file is named after
//! the sanitised base name the client declared, or, without one, after the
//! SHA-256 of its content. Files are never overwritten, except a
//! content-named file whose bytes no longer match its name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File already exists: {0}")]
    Conflict(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file written (or found already written) by [`FileStore::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name inside the store root
    pub name: String,
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// False when identical content was already stored under this name
    pub created: bool,
}

impl StoredFile {
    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    /// Human-readable size
    pub fn human_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size >= GB {
            format!("{:.2} GB", self.size as f64 / GB as f64)
        } else if self.size >= MB {
            format!("{:.2} MB", self.size as f64 / MB as f64)
        } else if self.size >= KB {
            format!("{:.2} KB", self.size as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size)
        }
    }
}

/// Flat directory of uploaded files
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Use `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `root`, creating it if missing
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root)
            .await
            .map_err(|e| StorageError::io(&store.root, e))?;
        info!("Upload directory: {}", store.root.display());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase hex SHA-256 of `data`
    pub fn content_name(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    /// Reduce a client-supplied filename to a safe base name
    ///
    /// Directory components (either slash style) are dropped, control
    /// characters removed and surrounding whitespace trimmed. Returns `None`
    /// when nothing usable is left.
    pub fn sanitize(filename: &str) -> Option<String> {
        let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
        let cleaned = cleaned.trim();

        match cleaned {
            "" | "." | ".." => None,
            name => Some(name.to_string()),
        }
    }

    /// Name `save` would give `data`, and whether it is content-derived
    pub fn target_name(data: &[u8], filename: Option<&str>) -> (String, bool) {
        match filename.and_then(Self::sanitize) {
            Some(name) => (name, false),
            None => (Self::content_name(data), true),
        }
    }

    /// Whether `name` is already taken inside the root
    pub async fn contains(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.root.join(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }

    /// Remove a file this store wrote
    pub async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.root.join(name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }

    /// Write `data`, named after `filename` when usable
    ///
    /// The bytes are staged in a hidden file under the root and only linked
    /// to their final name once fully written and synced, so a reader never
    /// sees a partial file under a real name.
    pub async fn save(
        &self,
        data: &[u8],
        filename: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        let (name, content_named) = Self::target_name(data, filename);
        let staged = self.stage(data).await?;
        let result = self.publish(&staged, name, data, content_named).await;

        match tokio::fs::remove_file(&staged).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging file {}: {}", staged.display(), e),
        }
        result
    }

    async fn stage(&self, data: &[u8]) -> Result<PathBuf, StorageError> {
        let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let staged = self
            .root
            .join(format!(".courier-{}-{}.part", std::process::id(), seq));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .await
            .map_err(|e| StorageError::io(&staged, e))?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            error!("Failed writing {}: {}", staged.display(), e);
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                error!("Failed to remove partial file {}: {}", staged.display(), cleanup);
            }
            return Err(StorageError::io(&staged, e));
        }
        Ok(staged)
    }

    async fn publish(
        &self,
        staged: &Path,
        name: String,
        data: &[u8],
        content_named: bool,
    ) -> Result<StoredFile, StorageError> {
        let path = self.root.join(&name);
        let size = data.len() as u64;

        let created = match tokio::fs::hard_link(staged, &path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists && content_named => {
                if Self::holds(&path, data).await? {
                    debug!("Content already stored as {}", name);
                    false
                } else {
                    // The name is the digest, so anything else there is damaged.
                    warn!("Replacing damaged {}", path.display());
                    tokio::fs::rename(staged, &path)
                        .await
                        .map_err(|e| StorageError::io(&path, e))?;
                    true
                }
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict(name));
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let stored = StoredFile {
            name,
            path,
            size,
            created,
        };
        if created {
            info!("Stored {} ({})", stored.name, stored.human_size());
        }
        Ok(stored)
    }

    /// Whether the file at `path` holds exactly `data`
    async fn holds(path: &Path, data: &[u8]) -> Result<bool, StorageError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        if !meta.is_file() || meta.len() != data.len() as u64 {
            return Ok(false);
        }
        let existing = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(Sha256::digest(&existing) == Sha256::digest(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_name() {
        assert_eq!(
            FileStore::content_name(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(FileStore::sanitize("a.txt"), Some("a.txt".to_string()));
        assert_eq!(FileStore::sanitize("../../etc/passwd"), Some("passwd".to_string()));
        assert_eq!(
            FileStore::sanitize(r"C:\Users\me\photo.jpg"),
            Some("photo.jpg".to_string())
        );
        assert_eq!(FileStore::sanitize("  spaced name.txt "), Some("spaced name.txt".to_string()));
        assert_eq!(FileStore::sanitize("bad\u{0}\nname"), Some("badname".to_string()));
        assert_eq!(FileStore::sanitize("dir/"), None);
        assert_eq!(FileStore::sanitize(".."), None);
        assert_eq!(FileStore::sanitize(""), None);
    }

    #[test]
    fn test_stored_file_helpers() {
        let file = StoredFile {
            name: "report.pdf".to_string(),
            path: PathBuf::from("/tmp/report.pdf"),
            size: 1024 * 1024 * 5, // 5MB
            created: true,
        };
        assert_eq!(file.extension(), Some("pdf"));
        assert_eq!(file.human_size(), "5.00 MB");

        let small = StoredFile { size: 500, ..file.clone() };
        assert_eq!(small.human_size(), "500 bytes");
        let kb = StoredFile { size: 2048, ..file };
        assert_eq!(kb.human_size(), "2.00 KB");
    }

    #[tokio::test]
    async fn test_open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("uploads");

        let store = FileStore::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_save_with_declared_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.save(b"hello", Some("greeting.txt")).await.unwrap();
        assert_eq!(stored.name, "greeting.txt");
        assert!(stored.created);
        assert_eq!(std::fs::read(dir.path().join("greeting.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_save_without_name_uses_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.save(b"hello", None).await.unwrap();
        assert_eq!(stored.name, FileStore::content_name(b"hello"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_same_content_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let first = store.save(b"same", None).await.unwrap();
        let second = store.save(b"same", None).await.unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.path, second.path);
    }

    #[tokio::test]
    async fn test_truncated_hash_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let payload = b"nineteen byte value";
        assert_eq!(payload.len(), 19);

        let path = dir.path().join(FileStore::content_name(payload));
        std::fs::write(&path, &payload[..7]).unwrap();

        let stored = store.save(payload, None).await.unwrap();
        assert!(stored.created);
        assert_eq!(stored.size, 19);
        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_save_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(b"one", Some("one.txt")).await.unwrap();
        store.save(b"two", None).await.unwrap();
        store.save(b"two", None).await.unwrap();
        store.save(b"three", Some("one.txt")).await.unwrap_err();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let mut expected = vec!["one.txt".to_string(), FileStore::content_name(b"two")];
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_contains_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(!store.contains("a.txt").await.unwrap());
        store.save(b"a", Some("a.txt")).await.unwrap();
        assert!(store.contains("a.txt").await.unwrap());
        store.remove("a.txt").await.unwrap();
        assert!(!store.contains("a.txt").await.unwrap());
    }

    #[test]
    fn test_target_name() {
        assert_eq!(
            FileStore::target_name(b"x", Some("../a.txt")),
            ("a.txt".to_string(), false)
        );
        assert_eq!(
            FileStore::target_name(b"hello", Some("..")),
            (FileStore::content_name(b"hello"), true)
        );
    }

    #[tokio::test]
    async fn test_declared_name_collision_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(b"first", Some("a.txt")).await.unwrap();
        let err = store.save(b"second", Some("a.txt")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(ref name) if name == "a.txt"));
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("does-not-exist"));

        let err = store.save(b"x", Some("x.txt")).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
