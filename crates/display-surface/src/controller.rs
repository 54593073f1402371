use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use scorebridge_core_types::ScorePayload;
use scorebridge_state_store::SettingsStore;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::document::{FONT_SIZE_INPUT_ID, SCORE_DISPLAY_ID};
use crate::panel::fill_controls;
use crate::{SurfaceError, SurfaceWindow, WindowFeatures, WindowHost};

/// Lifecycle of the surface window as last observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SurfaceState {
    Closed,
    OpenUninitialized,
    OpenReady,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub window_name: String,
    pub title: String,
    pub features: WindowFeatures,
    #[serde(with = "millis")]
    pub keep_alive: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            window_name: "ScoreWindow".into(),
            title: "Match score".into(),
            features: WindowFeatures::default(),
            keep_alive: Duration::from_secs(1),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

struct Slot {
    window: Option<Arc<dyn SurfaceWindow>>,
    state: SurfaceState,
}

/// Owns the surface window handle and its lifecycle.
///
/// Liveness is never cached across operations: every call re-probes the
/// window, since the host gives no close or navigate notification.
pub struct SurfaceController {
    host: Arc<dyn WindowHost>,
    config: SurfaceConfig,
    document: String,
    slot: Mutex<Slot>,
    settings: Mutex<Option<SettingsStore>>,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
}

impl SurfaceController {
    pub fn new(host: Arc<dyn WindowHost>, config: SurfaceConfig, document: String) -> Arc<Self> {
        Arc::new(Self {
            host,
            config,
            document,
            slot: Mutex::new(Slot {
                window: None,
                state: SurfaceState::Closed,
            }),
            settings: Mutex::new(None),
            keep_alive: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Store whose values refill the controls after every injection, since
    /// the injected document starts from its built-in defaults.
    pub fn attach_settings(&self, settings: SettingsStore) {
        *self.settings.lock() = Some(settings);
    }

    /// State recorded by the most recent operation; see [`Self::probe`].
    pub fn state(&self) -> SurfaceState {
        self.slot.lock().state
    }

    pub fn window(&self) -> Option<Arc<dyn SurfaceWindow>> {
        self.live_window()
    }

    pub fn is_live(&self) -> bool {
        self.live_window().is_some()
    }

    /// Opens the window, or focuses it when one is already live.
    pub fn open(&self) -> Result<SurfaceState, SurfaceError> {
        if let Some(window) = self.live_window() {
            window.focus();
            return Ok(self.state());
        }
        let window = self
            .host
            .open(&self.config.window_name, &self.config.features)?;
        info!(window = %self.config.window_name, "surface window opened");
        let mut slot = self.slot.lock();
        slot.window = Some(window);
        slot.state = SurfaceState::OpenUninitialized;
        Ok(slot.state)
    }

    /// Writes the full document. Failure leaves the state untouched.
    pub fn inject(&self) -> bool {
        let Some(window) = self.live_window() else {
            return false;
        };
        match window.write_document(&self.document) {
            Ok(()) => {
                self.set_state(SurfaceState::OpenReady);
                debug!("surface content injected");
                if let Some(settings) = self.settings.lock().as_ref() {
                    if let Err(err) = fill_controls(window.as_ref(), settings) {
                        debug!(%err, "surface controls not refilled");
                    }
                }
                true
            }
            Err(err) => {
                warn!(%err, "surface injection failed");
                false
            }
        }
    }

    /// Re-injects when the marker element is gone; true when content is intact.
    pub fn ensure_content(&self) -> bool {
        match self.marker_present() {
            Some(true) => {
                self.set_state(SurfaceState::OpenReady);
                true
            }
            Some(false) => {
                self.set_state(SurfaceState::OpenUninitialized);
                self.inject()
            }
            None => false,
        }
    }

    /// Re-derives the state from the window itself.
    pub fn probe(&self) -> SurfaceState {
        let state = match self.marker_present() {
            Some(true) => SurfaceState::OpenReady,
            Some(false) => SurfaceState::OpenUninitialized,
            None => SurfaceState::Closed,
        };
        self.set_state(state);
        state
    }

    /// One keep-alive cycle.
    pub fn keep_alive_tick(&self) -> SurfaceState {
        if self.probe() == SurfaceState::OpenUninitialized {
            info!("surface content missing; re-injecting");
            self.inject();
        }
        self.state()
    }

    /// Starts the periodic keep-alive, replacing any previous one.
    pub fn start_keep_alive(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.keep_alive;
        let mut slot = self.keep_alive.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.keep_alive_tick();
            }
        }));
    }

    pub fn keep_alive_running(&self) -> bool {
        self.keep_alive
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Writes the score and font size into the marker element. Errors are
    /// swallowed; the next probe reclassifies the window.
    pub fn render(&self, payload: &ScorePayload) -> bool {
        if self.state() != SurfaceState::OpenReady {
            return false;
        }
        let Some(window) = self.live_window() else {
            return false;
        };
        let result = window
            .set_text(SCORE_DISPLAY_ID, &payload.display_text())
            .and_then(|_| window.set_font_size(SCORE_DISPLAY_ID, payload.font_size_px))
            .and_then(|_| window.set_value(FONT_SIZE_INPUT_ID, &payload.font_size_px.to_string()));
        match result {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "surface render skipped");
                false
            }
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = self.keep_alive.lock().take() {
            handle.abort();
        }
    }

    fn live_window(&self) -> Option<Arc<dyn SurfaceWindow>> {
        let mut slot = self.slot.lock();
        match &slot.window {
            Some(window) if !window.is_closed() => Some(window.clone()),
            Some(_) => {
                info!("surface window closed by user");
                slot.window = None;
                slot.state = SurfaceState::Closed;
                None
            }
            None => None,
        }
    }

    /// `None` when no live window, otherwise whether the marker is present.
    fn marker_present(&self) -> Option<bool> {
        let window = self.live_window()?;
        window.has_element(SCORE_DISPLAY_ID).ok()
    }

    fn set_state(&self, state: SurfaceState) {
        self.slot.lock().state = state;
    }
}

impl Drop for SurfaceController {
    fn drop(&mut self) {
        if let Some(handle) = self.keep_alive.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AUTO_RELOAD_CHECKBOX_ID, AUTO_RELOAD_SECONDS_ID, SOUND_CHECKBOX_ID};
    use crate::{HeadlessWindowHost, SurfaceDocument};
    use scorebridge_core_types::{ContextId, Settings};
    use scorebridge_state_store::{OriginStorage, StorageKeys};

    fn controller(host: &Arc<HeadlessWindowHost>) -> Arc<SurfaceController> {
        let document = SurfaceDocument::new(StorageKeys::default(), None).render();
        SurfaceController::new(host.clone(), SurfaceConfig::default(), document)
    }

    #[test]
    fn open_inject_render() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        assert_eq!(surface.state(), SurfaceState::Closed);
        assert_eq!(surface.open().unwrap(), SurfaceState::OpenUninitialized);
        assert!(!surface.render(&ScorePayload::new("1", "0", 60)));
        assert!(surface.inject());
        assert_eq!(surface.state(), SurfaceState::OpenReady);

        assert!(surface.render(&ScorePayload::new("5", "3", 72)));
        let window = host.window("ScoreWindow").unwrap();
        assert_eq!(window.text_of(SCORE_DISPLAY_ID).as_deref(), Some("5 - 3"));
        assert_eq!(window.font_size_of(SCORE_DISPLAY_ID), Some(72));
        assert_eq!(window.value_of(FONT_SIZE_INPUT_ID).as_deref(), Some("72"));
    }

    #[test]
    fn render_twice_is_idempotent() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        surface.open().unwrap();
        surface.inject();
        let payload = ScorePayload::new("5", "3", 60);
        surface.render(&payload);
        let window = host.window("ScoreWindow").unwrap();
        let first = window.element(SCORE_DISPLAY_ID);
        surface.render(&payload);
        assert_eq!(window.element(SCORE_DISPLAY_ID), first);
    }

    #[test]
    fn second_open_reuses_window() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        surface.open().unwrap();
        surface.inject();
        assert_eq!(surface.open().unwrap(), SurfaceState::OpenReady);
        assert_eq!(host.opened(), 1);
    }

    #[test]
    fn closing_is_detected_lazily() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        surface.open().unwrap();
        surface.inject();
        host.window("ScoreWindow").unwrap().close();

        assert_eq!(surface.state(), SurfaceState::OpenReady);
        assert!(!surface.render(&ScorePayload::new("1", "1", 60)));
        assert_eq!(surface.probe(), SurfaceState::Closed);
        assert!(!surface.ensure_content());
    }

    #[test]
    fn blocked_injection_reports_failure() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        surface.open().unwrap();
        host.window("ScoreWindow").unwrap().block_writes(true);
        assert!(!surface.inject());
        assert_eq!(surface.state(), SurfaceState::OpenUninitialized);
    }

    #[test]
    fn popup_blocker_surfaces_as_error() {
        let host = HeadlessWindowHost::new();
        host.refuse_popups(true);
        let surface = controller(&host);
        assert!(matches!(
            surface.open(),
            Err(SurfaceError::OpenRejected { .. })
        ));
        assert_eq!(surface.state(), SurfaceState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_restores_wiped_content() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        surface.open().unwrap();
        surface.inject();
        surface.start_keep_alive();

        let window = host.window("ScoreWindow").unwrap();
        window.clear_document();
        assert!(!surface.render(&ScorePayload::new("2", "2", 60)));

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(window.write_count(), 2);
        assert!(surface.render(&ScorePayload::new("2", "2", 60)));
        assert_eq!(window.text_of(SCORE_DISPLAY_ID).as_deref(), Some("2 - 2"));
        surface.stop();
        assert!(!surface.keep_alive_running());
    }

    #[test]
    fn reinjection_restores_stored_controls() {
        let host = HeadlessWindowHost::new();
        let surface = controller(&host);
        let settings = SettingsStore::new(
            Arc::new(OriginStorage::in_memory().attach(ContextId::named("page"))),
            StorageKeys::default(),
            Settings::default(),
        );
        settings.seed_defaults();
        settings.set_font_size_raw("80").unwrap();
        settings.set_sound_enabled(false).unwrap();
        surface.attach_settings(settings);

        surface.open().unwrap();
        surface.inject();
        let window = host.window("ScoreWindow").unwrap();
        window.clear_document();
        assert_eq!(surface.keep_alive_tick(), SurfaceState::OpenReady);

        assert_eq!(window.value_of(FONT_SIZE_INPUT_ID).as_deref(), Some("80"));
        assert_eq!(window.font_size_of(SCORE_DISPLAY_ID), Some(80));
        assert_eq!(window.checked_of(SOUND_CHECKBOX_ID), Some(false));
        assert_eq!(window.checked_of(AUTO_RELOAD_CHECKBOX_ID), Some(true));
        assert_eq!(window.value_of(AUTO_RELOAD_SECONDS_ID).as_deref(), Some("600"));
    }
}
