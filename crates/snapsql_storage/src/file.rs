//! File-based backend for persistent storage.
//!
//! Layout under the backend root:
//!
//! ```text
//! <root>/
//! └─ <store name>/
//!    ├─ MANIFEST              # Store version and namespaces
//!    ├─ LOCK                  # Held exclusively while opening/upgrading
//!    └─ <namespace>/
//!       └─ <hex key>.rec      # One blob per key
//! ```

use crate::backend::{StoreBackend, StoreHandle, StoreSpec};
use crate::error::{StorageError, StorageResult};
use crate::manifest::StoreManifest;
use async_trait::async_trait;
use bytes::Bytes;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MANIFEST_FILE: &str = "MANIFEST";
const MANIFEST_TEMP: &str = "MANIFEST.tmp";
const LOCK_FILE: &str = "LOCK";
const RECORD_EXT: &str = "rec";

/// A directory-backed store backend.
///
/// Data survives process restarts.
///
/// # Durability
///
/// - Records are written to a temporary file, synced, then renamed over
///   the previous record
/// - The namespace directory is synced after the rename, so `put`
///   resolving means the new blob is on disk
///
/// # Example
///
/// ```no_run
/// use snapsql_storage::{FileBackend, StoreBackend, StoreHandle, StoreSpec};
/// use bytes::Bytes;
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let backend = FileBackend::new("data");
/// let handle = backend.open(&StoreSpec::new("app", 1, "files")).await.unwrap();
/// handle.put("files", "latest", Bytes::from_static(b"blob")).await.unwrap();
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `root`. Nothing is touched until a
    /// store is opened.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the backend root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a named store.
    #[must_use]
    pub fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reads a store manifest without opening the store.
    ///
    /// Returns `None` if the store has never been opened.
    pub fn read_manifest(&self, name: &str) -> StorageResult<Option<StoreManifest>> {
        load_manifest(&self.store_dir(name))
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    type Handle = FileHandle;

    async fn open(&self, spec: &StoreSpec) -> StorageResult<FileHandle> {
        if spec.name.is_empty() || spec.name.contains(&['/', '\\'][..]) || spec.name == ".." {
            return Err(StorageError::unavailable(format!(
                "invalid store name: {:?}",
                spec.name
            )));
        }

        let dir = self.store_dir(&spec.name);
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || open_blocking(dir, &spec))
            .await
            .map_err(StorageError::join)?
    }
}

fn open_blocking(dir: PathBuf, spec: &StoreSpec) -> StorageResult<FileHandle> {
    fs::create_dir_all(&dir).map_err(map_access)?;

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))
        .map_err(map_access)?;

    // Blocks other opens (threads or processes) until the upgrade is done.
    lock_file.lock_exclusive()?;
    let result = upgrade_locked(&dir, spec);
    // Released on close as well; unlocking explicitly keeps the window short.
    let _ = fs2::FileExt::unlock(&lock_file);

    let (manifest, upgraded_from) = result?;
    Ok(FileHandle {
        inner: Arc::new(FileInner {
            name: spec.name.clone(),
            dir,
            manifest,
            upgraded_from,
            temp_counter: AtomicU64::new(0),
        }),
    })
}

fn upgrade_locked(dir: &Path, spec: &StoreSpec) -> StorageResult<(StoreManifest, Option<u32>)> {
    let mut manifest = load_manifest(dir)?.unwrap_or_default();

    if manifest.version > spec.version {
        return Err(StorageError::VersionDowngrade {
            stored: manifest.version,
            requested: spec.version,
        });
    }

    if manifest.version == spec.version {
        return Ok((manifest, None));
    }

    let old = manifest.version;
    for namespace in &spec.namespaces {
        validate_namespace(namespace)?;
        fs::create_dir_all(dir.join(namespace))?;
        manifest.add_namespace(namespace);
    }
    manifest.version = spec.version;
    save_manifest(dir, &manifest)?;

    Ok((manifest, Some(old)))
}

fn load_manifest(dir: &Path) -> StorageResult<Option<StoreManifest>> {
    match fs::read(dir.join(MANIFEST_FILE)) {
        Ok(data) if data.is_empty() => Ok(None),
        Ok(data) => StoreManifest::decode(&data).map(Some),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Write-then-rename so a crash leaves either the old or the new manifest.
fn save_manifest(dir: &Path, manifest: &StoreManifest) -> StorageResult<()> {
    let temp_path = dir.join(MANIFEST_TEMP);
    let mut file = File::create(&temp_path)?;
    file.write_all(&manifest.encode())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, dir.join(MANIFEST_FILE))?;
    sync_directory(dir)
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be fsynced.
    Ok(())
}

fn validate_namespace(namespace: &str) -> StorageResult<()> {
    let valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && !namespace.contains(&['/', '\\'][..])
        && namespace != LOCK_FILE
        && !namespace.starts_with(MANIFEST_FILE);
    if valid {
        Ok(())
    } else {
        Err(StorageError::unavailable(format!(
            "invalid namespace name: {namespace:?}"
        )))
    }
}

fn map_access(err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::PermissionDenied => StorageError::unavailable(err.to_string()),
        _ => StorageError::Io(err),
    }
}

fn encode_key(key: &str) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(key.len() * 2);
    for byte in key.bytes() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[derive(Debug)]
struct FileInner {
    name: String,
    dir: PathBuf,
    manifest: StoreManifest,
    upgraded_from: Option<u32>,
    temp_counter: AtomicU64,
}

impl FileInner {
    fn namespace_dir(&self, namespace: &str) -> StorageResult<PathBuf> {
        if !self.manifest.has_namespace(namespace) {
            return Err(StorageError::MissingNamespace(namespace.to_string()));
        }
        Ok(self.dir.join(namespace))
    }

    fn read(&self, namespace: &str, key: &str) -> StorageResult<Option<Bytes>> {
        let path = self
            .namespace_dir(namespace)?
            .join(format!("{}.{RECORD_EXT}", encode_key(key)));
        match fs::read(path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        let ns_dir = self.namespace_dir(namespace)?;
        let stem = encode_key(key);
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = ns_dir.join(format!("{stem}.{seq}.tmp"));

        let mut file = File::create(&temp_path)?;
        file.write_all(value)?;
        file.sync_all()?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, ns_dir.join(format!("{stem}.{RECORD_EXT}"))) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }
        sync_directory(&ns_dir)
    }
}

/// Handle to a store opened through [`FileBackend`].
#[derive(Debug, Clone)]
pub struct FileHandle {
    inner: Arc<FileInner>,
}

impl FileHandle {
    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }
}

#[async_trait]
impl StoreHandle for FileHandle {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn version(&self) -> u32 {
        self.inner.manifest.version
    }

    fn upgraded_from(&self) -> Option<u32> {
        self.inner.upgraded_from
    }

    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Bytes>> {
        let inner = Arc::clone(&self.inner);
        let namespace = namespace.to_string();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || inner.read(&namespace, &key))
            .await
            .map_err(StorageError::join)?
    }

    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> StorageResult<()> {
        let inner = Arc::clone(&self.inner);
        let namespace = namespace.to_string();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || inner.write(&namespace, &key, &value))
            .await
            .map_err(StorageError::join)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spec() -> StoreSpec {
        StoreSpec::new("my-sqlite-db", 1, "sqlite-files")
    }

    #[tokio::test]
    async fn open_creates_layout() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let handle = backend.open(&spec()).await.unwrap();
        assert_eq!(handle.upgraded_from(), Some(0));

        let store_dir = dir.path().join("my-sqlite-db");
        assert!(store_dir.join("MANIFEST").exists());
        assert!(store_dir.join("sqlite-files").is_dir());

        let manifest = backend.read_manifest("my-sqlite-db").unwrap().unwrap();
        assert_eq!(manifest.version, 1);
        assert!(manifest.has_namespace("sqlite-files"));
    }

    #[tokio::test]
    async fn reopen_skips_upgrade() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.open(&spec()).await.unwrap();
        let handle = backend.open(&spec()).await.unwrap();
        assert_eq!(handle.upgraded_from(), None);
        assert_eq!(handle.version(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_opens_upgrade_once() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let backend = backend.clone();
            tasks.push(tokio::spawn(async move { backend.open(&spec()).await }));
        }

        let mut upgraded = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().upgraded_from().is_some() {
                upgraded += 1;
            }
        }
        assert_eq!(upgraded, 1);
    }

    #[tokio::test]
    async fn put_get_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let backend = FileBackend::new(dir.path());
            let handle = backend.open(&spec()).await.unwrap();
            handle
                .put("sqlite-files", "sqlite-export", Bytes::from_static(b"v1"))
                .await
                .unwrap();
            handle
                .put("sqlite-files", "sqlite-export", Bytes::from_static(b"v2"))
                .await
                .unwrap();
        }

        let backend = FileBackend::new(dir.path());
        let handle = backend.open(&spec()).await.unwrap();
        let value = handle.get("sqlite-files", "sqlite-export").await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"v2")));
    }

    #[tokio::test]
    async fn absent_key_is_none() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open(&spec()).await.unwrap();
        assert_eq!(handle.get("sqlite-files", "nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open(&spec()).await.unwrap();
        handle
            .put("sqlite-files", "k", Bytes::from_static(b"data"))
            .await
            .unwrap();

        let leftovers = fs::read_dir(handle.dir().join("sqlite-files"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn downgrade_rejected() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        backend
            .open(&StoreSpec::new("my-sqlite-db", 2, "sqlite-files"))
            .await
            .unwrap();

        let result = backend.open(&spec()).await;
        assert!(matches!(
            result,
            Err(StorageError::VersionDowngrade {
                stored: 2,
                requested: 1
            })
        ));
    }

    #[tokio::test]
    async fn unknown_namespace_fails() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open(&spec()).await.unwrap();
        assert!(matches!(
            handle.get("other", "k").await,
            Err(StorageError::MissingNamespace(_))
        ));
    }

    #[tokio::test]
    async fn invalid_store_name_unavailable() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let result = backend
            .open(&StoreSpec::new("../escape", 1, "sqlite-files"))
            .await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn key_encoding_is_hex() {
        assert_eq!(encode_key("ab"), "6162");
        assert_eq!(encode_key(""), "");
    }
}
