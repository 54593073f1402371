use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use scorebridge_selector::ObserveTarget;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::SchedulerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
}

/// The source page as seen by the scheduler.
pub trait PageHost: Send + Sync {
    /// Serialized current document.
    fn snapshot(&self) -> Result<String, SchedulerError>;

    /// Full page reload.
    fn reload(&self) -> Result<(), SchedulerError>;

    /// Subtree-wide child-list and attribute notifications under `target`.
    fn observe(&self, target: &ObserveTarget) -> broadcast::Receiver<MutationRecord>;

    /// `true` while the page is visible.
    fn visibility(&self) -> watch::Receiver<bool>;
}

/// In-memory page whose document is replaced wholesale.
pub struct MemoryPage {
    html: RwLock<String>,
    mutations: broadcast::Sender<MutationRecord>,
    visible: watch::Sender<bool>,
    observed: Mutex<Vec<ObserveTarget>>,
    reloads: AtomicUsize,
    unavailable: Mutex<bool>,
}

impl MemoryPage {
    pub fn new(html: impl Into<String>) -> Self {
        let (mutations, _) = broadcast::channel(64);
        let (visible, _) = watch::channel(true);
        Self {
            html: RwLock::new(html.into()),
            mutations,
            visible,
            observed: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
            unavailable: Mutex::new(false),
        }
    }

    /// Replaces the document and notifies observers.
    pub fn set_html(&self, html: impl Into<String>) {
        *self.html.write() = html.into();
        self.notify(MutationKind::ChildList);
    }

    /// Replaces the document without notifying observers, as when a
    /// mutation notification is missed.
    pub fn set_html_unobserved(&self, html: impl Into<String>) {
        *self.html.write() = html.into();
    }

    pub fn notify(&self, kind: MutationKind) {
        if self.mutations.send(MutationRecord { kind }).is_err() {
            debug!("mutation with no observers");
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    /// Makes snapshots fail, as a page torn down mid-navigation would.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn observed_targets(&self) -> Vec<ObserveTarget> {
        self.observed.lock().clone()
    }
}

impl PageHost for MemoryPage {
    fn snapshot(&self) -> Result<String, SchedulerError> {
        if *self.unavailable.lock() {
            return Err(SchedulerError::page("document not available"));
        }
        Ok(self.html.read().clone())
    }

    fn reload(&self) -> Result<(), SchedulerError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.notify(MutationKind::ChildList);
        Ok(())
    }

    fn observe(&self, target: &ObserveTarget) -> broadcast::Receiver<MutationRecord> {
        self.observed.lock().push(target.clone());
        self.mutations.subscribe()
    }

    fn visibility(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}
