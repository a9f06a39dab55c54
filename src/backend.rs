// Key/value blob persistence

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable storage for whole serialized documents, addressed by key
pub trait Backend {
    /// Read the blob stored under `key`, `None` if nothing is stored
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    fn save(&mut self, key: &str, blob: &str) -> Result<()>;

    /// Drop the blob stored under `key`; absent keys are not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

/// One JSON file per key inside a directory
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a backend rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create store directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(".lock"))
            .context("Failed to open store lock file")?;

        file.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(file)
    }
}

impl Backend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.path_for(key);

        if !path.exists() {
            return Ok(None);
        }

        let blob = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(blob))
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        // Lock is released when `_lock` is dropped
        let _lock = self.lock()?;

        let mut file = File::create(&tmp).context("Failed to create temp file")?;
        file.write_all(blob.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(key, bytes = blob.len(), "save: wrote blob");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let _lock = self.lock()?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "remove: deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

/// In-process backend, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    blobs: HashMap<String, String>,
    fail_saves: bool,
    fail_removes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, leaving stored blobs untouched
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Make every subsequent `remove` fail, leaving stored blobs untouched
    pub fn set_fail_removes(&mut self, fail: bool) {
        self.fail_removes = fail;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, blob: impl Into<String>) {
        self.blobs.insert(key.into(), blob.into());
    }
}

impl Backend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        validate_key(key)?;
        if self.fail_saves {
            return Err(eyre!("Storage unavailable"));
        }
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        if self.fail_removes {
            return Err(eyre!("Storage unavailable"));
        }
        self.blobs.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path().join("store")).unwrap();

        backend.save("momentum_tasks", "[]").unwrap();

        assert!(temp.path().join("store/momentum_tasks.json").exists());
        assert_eq!(backend.load("momentum_tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_backend_overwrites() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path()).unwrap();

        backend.save("k", "first").unwrap();
        backend.save("k", "second").unwrap();

        assert_eq!(backend.load("k").unwrap().as_deref(), Some("second"));
        assert!(!temp.path().join("k.json.tmp").exists());
    }

    #[test]
    fn test_file_backend_missing_key() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::open(temp.path()).unwrap();

        assert!(backend.load("nothing").unwrap().is_none());
    }

    #[test]
    fn test_file_backend_remove() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path()).unwrap();

        backend.save("k", "data").unwrap();
        backend.remove("k").unwrap();
        assert!(backend.load("k").unwrap().is_none());

        // Removing again is fine
        backend.remove("k").unwrap();
    }

    #[test]
    fn test_memory_backend_fail_saves() {
        let mut backend = MemoryBackend::new();
        backend.save("k", "one").unwrap();

        backend.set_fail_saves(true);
        assert!(backend.save("k", "two").is_err());
        assert_eq!(backend.get("k"), Some("one"));
    }

    #[test]
    fn test_memory_backend_fail_removes() {
        let mut backend = MemoryBackend::new();
        backend.save("k", "one").unwrap();

        backend.set_fail_removes(true);
        assert!(backend.remove("k").is_err());
        assert_eq!(backend.get("k"), Some("one"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("momentum_tasks").is_ok());
        assert!(validate_key("momentum-tasks").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
