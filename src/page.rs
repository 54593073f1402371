//! Source page backed by an HTML snapshot file.
//!
//! The file's modification time stands in for mutation notifications and a
//! reload re-reads it from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};
use scorebridge_scheduler::{MutationKind, MutationRecord, PageHost, SchedulerError};
use scorebridge_selector::ObserveTarget;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct FilePage {
    path: PathBuf,
    html: RwLock<String>,
    modified: Mutex<Option<SystemTime>>,
    mutations: broadcast::Sender<MutationRecord>,
    visible: watch::Sender<bool>,
    reloads: AtomicUsize,
}

impl FilePage {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let html = fs::read_to_string(&path)?;
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        let (mutations, _) = broadcast::channel(64);
        let (visible, _) = watch::channel(true);
        Ok(Arc::new(Self {
            path,
            html: RwLock::new(html),
            modified: Mutex::new(modified),
            mutations,
            visible,
            reloads: AtomicUsize::new(0),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Re-reads the file when its modification time moved; true on change.
    pub fn refresh(&self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                debug!(path = %self.path.display(), %err, "page file not readable");
                return false;
            }
        };
        {
            let mut last = self.modified.lock();
            if *last == Some(modified) {
                return false;
            }
            *last = Some(modified);
        }
        match self.read() {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to re-read page file");
                false
            }
        }
    }

    /// Polls the file every `period` until the page is dropped.
    pub fn spawn_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(page) = weak.upgrade() else {
                    break;
                };
                page.refresh();
            }
        })
    }

    fn read(&self) -> io::Result<()> {
        let html = fs::read_to_string(&self.path)?;
        *self.html.write() = html;
        let _ = self.mutations.send(MutationRecord {
            kind: MutationKind::ChildList,
        });
        Ok(())
    }
}

impl PageHost for FilePage {
    fn snapshot(&self) -> Result<String, SchedulerError> {
        Ok(self.html.read().clone())
    }

    fn reload(&self) -> Result<(), SchedulerError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.read()
            .map_err(|err| SchedulerError::page(format!("{}: {err}", self.path.display())))?;
        info!(path = %self.path.display(), "page reloaded");
        Ok(())
    }

    fn observe(&self, target: &ObserveTarget) -> broadcast::Receiver<MutationRecord> {
        debug!(?target, path = %self.path.display(), "watching page file");
        self.mutations.subscribe()
    }

    fn visibility(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}
