use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use scorebridge_core_types::ContextId;
use serde_json::to_writer_pretty;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::StoreError;

const CHANGE_CAPACITY: usize = 256;

/// Notification raised in other contexts when a key changes value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub new_value: Option<String>,
    pub writer: ContextId,
}

/// Synchronous string store as seen from one context.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Changes written by *other* contexts of the same origin.
    fn listen(&self) -> StorageListener;
    fn context(&self) -> &ContextId;
}

/// Receiver of storage change notifications that skips the owner's writes.
pub struct StorageListener {
    rx: broadcast::Receiver<StorageChange>,
    own: ContextId,
}

impl StorageListener {
    pub async fn recv(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.writer == self.own => continue,
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, context = %self.own, "storage listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

struct OriginInner {
    values: RwLock<BTreeMap<String, String>>,
    /// File content as of the last load, merge or persist. Writers hold this
    /// lock for the whole merge-persist-commit sequence.
    disk: Mutex<BTreeMap<String, String>>,
    changes: broadcast::Sender<StorageChange>,
    path: Option<PathBuf>,
    writes_blocked: AtomicBool,
}

/// Backing storage shared by every context of one origin.
///
/// A file-backed store may share its file with other processes: every write
/// first merges keys changed on disk since the last look, and
/// [`OriginStorage::sync_from_disk`] does the same on demand. Either way the
/// merged keys are announced as written by [`external_writer`].
#[derive(Clone)]
pub struct OriginStorage {
    inner: Arc<OriginInner>,
}

/// Writer recorded on changes that arrived through the backing file.
pub fn external_writer() -> ContextId {
    ContextId::named("external")
}

impl OriginStorage {
    pub fn in_memory() -> Self {
        Self::with_values(BTreeMap::new(), None)
    }

    /// Opens a file-backed store, rewriting the file on every change.
    /// An unreadable or malformed file starts an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "malformed store file; starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable store file; starting empty");
                BTreeMap::new()
            }
        };
        Self::with_values(values, Some(path))
    }

    fn with_values(values: BTreeMap<String, String>, path: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(OriginInner {
                disk: Mutex::new(values.clone()),
                values: RwLock::new(values),
                changes,
                path,
                writes_blocked: AtomicBool::new(false),
            }),
        }
    }

    /// Handle for one context of this origin.
    pub fn attach(&self, context: ContextId) -> ContextStorage {
        ContextStorage {
            origin: self.clone(),
            context,
        }
    }

    /// Simulates a host that refuses writes (quota, private browsing).
    pub fn block_writes(&self, blocked: bool) {
        self.inner.writes_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.values.read().clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Picks up keys another process changed in the backing file and
    /// announces them. Returns the keys that changed here.
    pub fn sync_from_disk(&self) -> Vec<String> {
        let Some(path) = self.inner.path.as_ref() else {
            return Vec::new();
        };
        let merged = {
            let mut disk = self.inner.disk.lock();
            self.merge_locked(path, &mut disk)
        };
        let keys = merged.iter().map(|change| change.key.clone()).collect();
        self.announce(merged);
        keys
    }

    fn read(&self, key: &str) -> Option<String> {
        self.inner.values.read().get(key).cloned()
    }

    fn write(&self, writer: &ContextId, key: &str, value: &str) -> Result<(), StoreError> {
        if self.inner.writes_blocked.load(Ordering::SeqCst) {
            return Err(StoreError::WriteBlocked {
                key: key.to_string(),
            });
        }

        let (merged, committed) = {
            let mut disk = self.inner.disk.lock();
            let merged = match self.inner.path.as_ref() {
                Some(path) => self.merge_locked(path, &mut disk),
                None => Vec::new(),
            };
            (merged, self.commit_locked(&mut disk, key, value))
        };
        self.announce(merged);

        if committed? {
            self.announce(vec![StorageChange {
                key: key.to_string(),
                new_value: Some(value.to_string()),
                writer: writer.clone(),
            }]);
        }
        Ok(())
    }

    /// Applies file keys that differ from the last known file content.
    fn merge_locked(
        &self,
        path: &Path,
        disk: &mut BTreeMap<String, String>,
    ) -> Vec<StorageChange> {
        let Some(current) = read_snapshot(path) else {
            return Vec::new();
        };
        let mut values = self.inner.values.write();
        let mut merged = Vec::new();
        for (key, value) in &current {
            if disk.get(key) == Some(value) || values.get(key) == Some(value) {
                continue;
            }
            values.insert(key.clone(), value.clone());
            merged.push(StorageChange {
                key: key.clone(),
                new_value: Some(value.clone()),
                writer: external_writer(),
            });
        }
        *disk = current;
        if !merged.is_empty() {
            debug!(path = %path.display(), keys = merged.len(), "merged external store changes");
        }
        merged
    }

    /// Persists first; memory only changes once the file holds the value.
    fn commit_locked(
        &self,
        disk: &mut BTreeMap<String, String>,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut next = self.inner.values.read().clone();
        if next.get(key).map(String::as_str) == Some(value) {
            return Ok(false);
        }
        next.insert(key.to_string(), value.to_string());
        if let Some(path) = self.inner.path.as_ref() {
            write_snapshot(path, &next)?;
            *disk = next.clone();
        }
        *self.inner.values.write() = next;
        Ok(true)
    }

    fn announce(&self, changes: Vec<StorageChange>) {
        for change in changes {
            // No receivers is the normal single-context case.
            let _ = self.inner.changes.send(change);
        }
    }

    fn subscribe(&self, own: ContextId) -> StorageListener {
        StorageListener {
            rx: self.inner.changes.subscribe(),
            own,
        }
    }
}

/// Current file content; `None` when absent or mid-rewrite by another writer.
fn read_snapshot(path: &Path) -> Option<BTreeMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %path.display(), %err, "store file not readable");
            }
            return None;
        }
    };
    serde_json::from_str(&raw)
        .map_err(|err| debug!(path = %path.display(), %err, "store file not parseable"))
        .ok()
}

fn write_snapshot(path: &Path, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp = path.with_extension("json.tmp");
    let persisted = write_file(&temp, values)
        .and_then(|()| fs::rename(&temp, path).map_err(StoreError::from));
    if persisted.is_err() {
        let _ = fs::remove_file(&temp);
    }
    persisted?;
    debug!(path = %path.display(), keys = values.len(), "store persisted");
    Ok(())
}

fn write_file(path: &Path, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, values).map_err(|err| StoreError::Serialize(err.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// One context's view of the origin storage.
#[derive(Clone)]
pub struct ContextStorage {
    origin: OriginStorage,
    context: ContextId,
}

impl ContextStorage {
    pub fn origin(&self) -> &OriginStorage {
        &self.origin
    }
}

impl KeyValueStore for ContextStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.origin.read(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.origin.write(&self.context, key, value)
    }

    fn listen(&self) -> StorageListener {
        self.origin.subscribe(self.context.clone())
    }

    fn context(&self) -> &ContextId {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn change_reaches_other_context_only() {
        let origin = OriginStorage::in_memory();
        let page = origin.attach(ContextId::named("page"));
        let popup = origin.attach(ContextId::named("popup"));
        let mut page_events = page.listen();
        let mut popup_events = popup.listen();

        page.set("k", "v").unwrap();

        let change = popup_events.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.new_value.as_deref(), Some("v"));
        assert_eq!(change.writer, ContextId::named("page"));
        assert!(timeout(Duration::from_millis(20), page_events.recv())
            .await
            .is_err());
        assert_eq!(popup.get("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn rewriting_same_value_is_silent() {
        let origin = OriginStorage::in_memory();
        let page = origin.attach(ContextId::named("page"));
        let popup = origin.attach(ContextId::named("popup"));
        page.set("k", "v").unwrap();
        let mut popup_events = popup.listen();

        page.set("k", "v").unwrap();
        assert!(timeout(Duration::from_millis(20), popup_events.recv())
            .await
            .is_err());
    }

    #[test]
    fn blocked_writes_fail_without_mutation() {
        let origin = OriginStorage::in_memory();
        let page = origin.attach(ContextId::named("page"));
        origin.block_writes(true);
        assert!(matches!(
            page.set("k", "v"),
            Err(StoreError::WriteBlocked { .. })
        ));
        assert!(page.get("k").is_none());
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("store.json");
        {
            let origin = OriginStorage::open(&path);
            origin.attach(ContextId::new()).set("faceitScoreFontSize", "80").unwrap();
        }
        let reopened = OriginStorage::open(&path);
        assert_eq!(
            reopened.snapshot().get("faceitScoreFontSize").map(String::as_str),
            Some("80")
        );
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        let origin = OriginStorage::open(&path);
        assert!(origin.snapshot().is_empty());
    }

    #[tokio::test]
    async fn second_process_setting_survives_payload_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let watcher = OriginStorage::open(&path);
        let page = watcher.attach(ContextId::named("page"));
        page.set("faceitScoreFontSize", "60").unwrap();
        let mut page_events = page.listen();

        let cli = OriginStorage::open(&path);
        cli.attach(ContextId::named("cli"))
            .set("faceitScoreFontSize", "80")
            .unwrap();

        page.set("faceitScorePayload", "{}").unwrap();

        assert_eq!(page.get("faceitScoreFontSize").as_deref(), Some("80"));
        let change = page_events.recv().await.unwrap();
        assert_eq!(change.key, "faceitScoreFontSize");
        assert_eq!(change.new_value.as_deref(), Some("80"));
        assert_eq!(change.writer, external_writer());

        let reopened = OriginStorage::open(&path).snapshot();
        assert_eq!(reopened.get("faceitScoreFontSize").map(String::as_str), Some("80"));
        assert_eq!(reopened.get("faceitScorePayload").map(String::as_str), Some("{}"));
    }

    #[test]
    fn sync_picks_up_external_edits_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let origin = OriginStorage::open(&path);
        let page = origin.attach(ContextId::named("page"));
        page.set("faceitScoreSoundEnabled", "true").unwrap();

        fs::write(&path, r#"{"faceitScoreSoundEnabled": "false"}"#).unwrap();
        assert_eq!(origin.sync_from_disk(), vec!["faceitScoreSoundEnabled".to_string()]);
        assert_eq!(page.get("faceitScoreSoundEnabled").as_deref(), Some("false"));
        assert!(origin.sync_from_disk().is_empty());

        fs::write(&path, "{trunc").unwrap();
        assert!(origin.sync_from_disk().is_empty());
        assert!(OriginStorage::in_memory().sync_from_disk().is_empty());
    }

    #[tokio::test]
    async fn failed_persist_leaves_value_unset_and_silent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::create_dir_all(&path).unwrap();
        let origin = OriginStorage::open(&path);
        let page = origin.attach(ContextId::named("page"));
        let mut popup_events = origin.attach(ContextId::named("popup")).listen();

        assert!(matches!(page.set("k", "v"), Err(StoreError::Io(_))));
        assert!(page.get("k").is_none());
        assert!(timeout(Duration::from_millis(20), popup_events.recv())
            .await
            .is_err());
        assert!(!dir.path().join("store.json.tmp").exists());
    }
}
