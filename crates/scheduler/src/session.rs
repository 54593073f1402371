use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scorebridge_core_types::ScorePayload;
use scorebridge_display_surface::{SurfaceController, SurfaceState};
use scorebridge_event_bus::{BusEvent, CrossContextBus};
use scorebridge_selector::{ObserveTarget, ResolvedScore, ScoreResolver};
use scorebridge_state_store::SettingsStore;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::model::{ExtractionOutcome, SchedulerConfig, Trigger};
use crate::page::PageHost;
use crate::reload::AutoReloadPolicy;
use crate::sound::SoundNotifier;
use crate::timer::TimerSlot;
use crate::SchedulerError;

/// Collaborators a [`Session`] is built from.
pub struct SessionParts {
    pub page: Arc<dyn PageHost>,
    pub resolver: ScoreResolver,
    pub settings: SettingsStore,
    pub bus: CrossContextBus,
    pub surface: Arc<SurfaceController>,
    pub sound: SoundNotifier,
    pub config: SchedulerConfig,
}

/// Hands extraction requests to the single worker. A request arriving while
/// an extraction is in flight, or while one is already queued, is dropped.
#[derive(Clone)]
pub struct ExtractionRequester {
    tx: mpsc::Sender<Trigger>,
    in_flight: Arc<AtomicBool>,
}

impl ExtractionRequester {
    pub fn request(&self, trigger: Trigger) -> bool {
        metrics::record_requested();
        if self.in_flight.load(Ordering::SeqCst) || self.tx.try_send(trigger).is_err() {
            metrics::record_dropped();
            debug!(trigger = trigger.name(), "extraction request dropped");
            return false;
        }
        true
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Process-scoped state of the page context: current surface, last score,
/// timers and the audio unlock flag.
pub struct Session {
    page: Arc<dyn PageHost>,
    resolver: ScoreResolver,
    settings: SettingsStore,
    bus: CrossContextBus,
    surface: Arc<SurfaceController>,
    sound: SoundNotifier,
    config: SchedulerConfig,
    last_score: Mutex<Option<String>>,
    in_flight: Arc<AtomicBool>,
    requester: ExtractionRequester,
    requests: Mutex<Option<mpsc::Receiver<Trigger>>>,
    update_timer: TimerSlot,
    reload_timer: TimerSlot,
}

impl Session {
    pub fn new(parts: SessionParts) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(1);
        let in_flight = Arc::new(AtomicBool::new(false));
        Arc::new(Self {
            page: parts.page,
            resolver: parts.resolver,
            settings: parts.settings,
            bus: parts.bus,
            surface: parts.surface,
            sound: parts.sound,
            config: parts.config,
            last_score: Mutex::new(None),
            requester: ExtractionRequester {
                tx,
                in_flight: in_flight.clone(),
            },
            in_flight,
            requests: Mutex::new(Some(rx)),
            update_timer: TimerSlot::new("update"),
            reload_timer: TimerSlot::new("auto-reload"),
        })
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn bus(&self) -> &CrossContextBus {
        &self.bus
    }

    pub fn surface(&self) -> &Arc<SurfaceController> {
        &self.surface
    }

    pub fn sound(&self) -> &SoundNotifier {
        &self.sound
    }

    pub fn page(&self) -> &Arc<dyn PageHost> {
        &self.page
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn requester(&self) -> ExtractionRequester {
        self.requester.clone()
    }

    /// Receiving end of the request queue; only the first caller gets it.
    pub fn take_requests(&self) -> Option<mpsc::Receiver<Trigger>> {
        self.requests.lock().take()
    }

    pub fn last_score(&self) -> Option<String> {
        self.last_score.lock().clone()
    }

    pub fn update_timer_armed(&self) -> bool {
        self.update_timer.is_armed()
    }

    pub fn reload_timer_armed(&self) -> bool {
        self.reload_timer.is_armed()
    }

    /// Seeds absent settings with defaults.
    pub fn initialize(&self) -> Vec<String> {
        self.settings.seed_defaults()
    }

    /// Subtree to watch for mutations: first present container, else body.
    pub fn observe_target(&self) -> ObserveTarget {
        match self.page.snapshot() {
            Ok(html) => self.resolver.observe_target_html(&html),
            Err(err) => {
                debug!(%err, "no snapshot for observe target; watching body");
                ObserveTarget::Body
            }
        }
    }

    /// Resolves the score, sounds on change and propagates the payload.
    pub async fn extract_and_propagate(&self, trigger: Trigger) -> ExtractionOutcome {
        let Some(_guard) = InFlight::enter(&self.in_flight) else {
            metrics::record_skipped();
            return ExtractionOutcome::Skipped;
        };

        let Some(resolved) = self.resolve() else {
            metrics::record_not_found();
            return ExtractionOutcome::NotFound;
        };
        metrics::record_extracted();

        let payload = ScorePayload::new(
            resolved.team_a,
            resolved.team_b,
            self.settings.font_size(),
        );
        let key = payload.score_key();
        let previous = self.last_score.lock().replace(key.clone());
        let changed = previous.as_deref() != Some(key.as_str());

        let mut sounded = false;
        if changed {
            metrics::record_changed();
            match previous {
                Some(previous) => {
                    info!(from = %previous, to = %key, trigger = trigger.name(), "score changed");
                    if self.settings.sound_enabled() && self.sound.notify() {
                        metrics::record_sounded();
                        sounded = true;
                    }
                }
                None => info!(score = %key, trigger = trigger.name(), "initial score observed"),
            }
        }

        let report = self.bus.publish(BusEvent::ScoreUpdate(payload.clone())).await;
        if !report.any_delivered() {
            debug!("score update reached no transport");
        }

        let rendered = self.surface.is_live() && self.surface.render(&payload);
        if rendered {
            metrics::record_rendered();
        }

        ExtractionOutcome::Extracted {
            payload,
            tier: resolved.tier,
            changed,
            sounded,
            rendered,
            report,
        }
    }

    /// Re-reads the store and re-arms the reload timer; true when armed.
    pub fn apply_auto_reload(&self) -> bool {
        self.reload_timer.clear();
        let policy = AutoReloadPolicy::from_store(&self.settings);
        let Some(period) = policy.interval(self.config.min_reload_interval) else {
            debug!(?policy, "auto-reload disabled");
            return false;
        };
        let page = self.page.clone();
        let armed = self.reload_timer.arm_interval(period, move || {
            metrics::record_reload();
            if let Err(err) = page.reload() {
                warn!(%err, "page reload failed");
            }
        });
        if armed {
            info!(?period, "auto-reload armed");
        }
        armed
    }

    /// (Re)starts the fixed-interval poll.
    pub fn start_update_interval(&self) {
        let requester = self.requester.clone();
        self.update_timer
            .arm_interval(self.config.update_interval, move || {
                requester.request(Trigger::Poll);
            });
    }

    /// Restarts the poll and asks for one immediate extraction. The poll keeps
    /// running while hidden so score changes still sound.
    pub fn on_visibility_change(&self, visible: bool) {
        debug!(visible, "visibility changed; restarting poll");
        self.start_update_interval();
        self.requester.request(Trigger::Visibility);
    }

    /// The user-facing "show score" control.
    pub fn on_show_score(&self) -> Result<SurfaceState, SchedulerError> {
        let opened = self.surface.open();
        if let Err(err) = &opened {
            warn!(%err, "surface window could not be opened");
        }
        self.surface.ensure_content();
        self.start_update_interval();
        self.surface.start_keep_alive();
        self.sound.unlock();
        opened?;
        Ok(self.surface.state())
    }

    pub fn stop(&self) {
        self.update_timer.clear();
        self.reload_timer.clear();
        self.surface.stop();
    }

    fn resolve(&self) -> Option<ResolvedScore> {
        match self.page.snapshot() {
            Ok(html) => self.resolver.resolve_html(&html),
            Err(err) => {
                debug!(%err, "page snapshot failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorebridge_core_types::{ContextId, Settings};
    use scorebridge_display_surface::{HeadlessWindowHost, SurfaceConfig, SurfaceDocument};
    use scorebridge_selector::SelectorStrategy;
    use scorebridge_state_store::{OriginStorage, StorageKeys};

    use crate::page::MemoryPage;
    use crate::sound::RecordingSink;

    fn session() -> Arc<Session> {
        let origin = OriginStorage::in_memory();
        let context = ContextId::named("page");
        let settings = SettingsStore::new(
            Arc::new(origin.attach(context.clone())),
            StorageKeys::default(),
            Settings::default(),
        );
        let document = SurfaceDocument::new(StorageKeys::default(), None).render();
        Session::new(SessionParts {
            page: Arc::new(MemoryPage::new(
                r#"<h3 class="FactionsDetails__FactionScore-a">2</h3>
                   <h3 class="FactionsDetails__FactionScore-b">1</h3>"#,
            )),
            resolver: ScoreResolver::new(&SelectorStrategy::default()).unwrap(),
            settings: settings.clone(),
            bus: CrossContextBus::standard(context, None, settings),
            surface: SurfaceController::new(
                HeadlessWindowHost::new(),
                SurfaceConfig::default(),
                document,
            ),
            sound: SoundNotifier::new(RecordingSink::new()),
            config: SchedulerConfig::default(),
        })
    }

    #[tokio::test]
    async fn requests_during_extraction_are_dropped() {
        let session = session();
        session.in_flight.store(true, Ordering::SeqCst);

        assert!(!session.requester().request(Trigger::Poll));
        assert!(!session.requester().request(Trigger::Mutation));
        assert_eq!(
            session.extract_and_propagate(Trigger::Poll).await,
            ExtractionOutcome::Skipped
        );
        let mut requests = session.take_requests().unwrap();
        assert!(requests.try_recv().is_err());

        session.in_flight.store(false, Ordering::SeqCst);
        assert!(matches!(
            session.extract_and_propagate(Trigger::Manual).await,
            ExtractionOutcome::Extracted { .. }
        ));
        assert!(!session.in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn second_request_is_dropped_while_one_is_queued() {
        let session = session();
        let requester = session.requester();

        assert!(requester.request(Trigger::Mutation));
        assert!(!requester.request(Trigger::Poll));
        assert!(!requester.request(Trigger::Visibility));

        let mut requests = session.take_requests().unwrap();
        assert_eq!(requests.try_recv().ok(), Some(Trigger::Mutation));
        assert!(requests.try_recv().is_err());
        assert!(requester.request(Trigger::Poll));
    }
}
