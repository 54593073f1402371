use std::sync::Arc;

use parking_lot::Mutex;
use scorebridge_event_bus::BusEvent;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::Trigger;
use crate::session::Session;
use crate::SchedulerError;

/// Wires every trigger source of a [`Session`] into its extraction worker.
pub struct SchedulerRuntime {
    session: Arc<Session>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl SchedulerRuntime {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            tasks: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Seeds settings, starts the worker and watchers, requests the first
    /// extraction and applies the auto-reload policy.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let requests = self
            .session
            .take_requests()
            .ok_or(SchedulerError::AlreadyRunning)?;

        let seeded = self.session.initialize();
        if !seeded.is_empty() {
            info!(?seeded, "default settings written");
        }

        let mut tasks = self.tasks.lock();
        tasks.push(self.spawn_worker(requests));
        tasks.push(self.spawn_mutation_watcher());
        tasks.push(self.spawn_visibility_watcher());
        tasks.push(self.spawn_bus_listener());

        self.session.start_update_interval();
        self.session.requester().request(Trigger::Initial);
        self.session.apply_auto_reload();
        info!("scheduler started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.tasks.lock().is_empty()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.session.stop();
        info!("scheduler stopped");
    }

    fn spawn_worker(&self, mut requests: tokio::sync::mpsc::Receiver<Trigger>) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    _ = shutdown.cancelled() => break,
                    request = requests.recv() => match request {
                        Some(trigger) => {
                            let outcome = session.extract_and_propagate(trigger).await;
                            debug!(trigger = trigger.name(), ?outcome, "extraction finished");
                        }
                        None => break,
                    },
                }
            }
        })
    }

    fn spawn_mutation_watcher(&self) -> JoinHandle<()> {
        let target = self.session.observe_target();
        debug!(?target, "observing page mutations");
        let mut mutations = self.session.page().observe(&target);
        let requester = self.session.requester();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    _ = shutdown.cancelled() => break,
                    record = mutations.recv() => match record {
                        Ok(_) | Err(RecvError::Lagged(_)) => {
                            requester.request(Trigger::Mutation);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    fn spawn_visibility_watcher(&self) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let mut visibility = session.page().visibility();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    _ = shutdown.cancelled() => break,
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let visible = *visibility.borrow_and_update();
                        session.on_visibility_change(visible);
                    }
                }
            }
        })
    }

    /// Settings changes from any context re-derive the reload policy from
    /// the store; the message itself carries no values.
    fn spawn_bus_listener(&self) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let mut subscription = session.bus().subscribe(session.config().bus_capacity);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    _ = shutdown.cancelled() => break,
                    delivery = subscription.recv() => match delivery {
                        Some(delivery) => match delivery.event {
                            BusEvent::SettingsChanged => {
                                debug!(via = delivery.via.name(), "settings changed elsewhere");
                                session.apply_auto_reload();
                            }
                            BusEvent::ScoreUpdate(_) => {}
                        },
                        None => {
                            warn!("bus subscription closed");
                            break;
                        }
                    },
                }
            }
        })
    }
}

impl Drop for SchedulerRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
        self.session.stop();
    }
}
