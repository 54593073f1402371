use std::sync::Arc;

use parking_lot::Mutex;
use scorebridge_core_types::ScorePayload;
use scorebridge_event_bus::{
    BusEvent, BusSubscription, CrossContextBus, Delivery, PayloadDeduper, PublishReport,
};
use scorebridge_state_store::SettingsStore;
use tracing::{debug, info};

use crate::document::{
    AUTO_RELOAD_CHECKBOX_ID, AUTO_RELOAD_SECONDS_ID, FONT_SIZE_INPUT_ID, SCORE_DISPLAY_ID,
    SOUND_CHECKBOX_ID,
};
use crate::{SurfaceError, SurfaceWindow};

/// Writes the stored settings into the surface controls. Blank or missing
/// font sizes show the default; the seconds field shows the raw stored text.
pub fn fill_controls(window: &dyn SurfaceWindow, settings: &SettingsStore) -> Result<(), SurfaceError> {
    let keys = settings.keys();
    let store = settings.store();
    let font_raw = store
        .get(&keys.font_size)
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| settings.defaults().font_size_px.to_string());

    window.set_value(FONT_SIZE_INPUT_ID, &font_raw)?;
    window.set_font_size(SCORE_DISPLAY_ID, settings.font_size())?;
    window.set_checked(SOUND_CHECKBOX_ID, settings.sound_enabled())?;
    window.set_checked(AUTO_RELOAD_CHECKBOX_ID, settings.auto_reload_enabled())?;
    window.set_value(
        AUTO_RELOAD_SECONDS_ID,
        &store.get(&keys.auto_reload_seconds).unwrap_or_default(),
    )
}

/// Logic running inside the surface context: it renders whatever the bus
/// delivers and turns control edits into store writes plus `settingsChanged`.
pub struct SurfacePanel {
    window: Arc<dyn SurfaceWindow>,
    settings: SettingsStore,
    bus: CrossContextBus,
    dedupe: Mutex<PayloadDeduper>,
}

impl SurfacePanel {
    pub fn new(window: Arc<dyn SurfaceWindow>, settings: SettingsStore, bus: CrossContextBus) -> Self {
        Self {
            window,
            settings,
            bus,
            dedupe: Mutex::new(PayloadDeduper::new()),
        }
    }

    /// Populates the controls from the store, as the document does on load.
    pub fn load_controls(&self) -> Result<(), SurfaceError> {
        fill_controls(self.window.as_ref(), &self.settings)?;
        self.dedupe.lock().reset();
        Ok(())
    }

    /// Applies one incoming event; true when the visible score changed.
    pub fn apply(&self, delivery: &Delivery) -> bool {
        match &delivery.event {
            BusEvent::ScoreUpdate(payload) => {
                if !self.dedupe.lock().accept(payload) {
                    debug!(via = delivery.via.name(), "duplicate score update ignored");
                    return false;
                }
                match self.render(payload) {
                    Ok(()) => {
                        info!(score = %payload, via = delivery.via.name(), "score rendered");
                        true
                    }
                    Err(err) => {
                        debug!(%err, "panel render failed");
                        self.dedupe.lock().reset();
                        false
                    }
                }
            }
            BusEvent::SettingsChanged => false,
        }
    }

    pub async fn on_font_size_input(&self, raw: &str) -> Result<PublishReport, SurfaceError> {
        self.settings.set_font_size_raw(raw)?;
        if let Err(err) = self
            .window
            .set_font_size(SCORE_DISPLAY_ID, self.settings.font_size())
        {
            debug!(%err, "font size not applied to surface");
        }
        Ok(self.announce().await)
    }

    pub async fn on_sound_toggle(&self, enabled: bool) -> Result<PublishReport, SurfaceError> {
        self.settings.set_sound_enabled(enabled)?;
        Ok(self.announce().await)
    }

    pub async fn on_auto_reload_toggle(&self, enabled: bool) -> Result<PublishReport, SurfaceError> {
        self.settings.set_auto_reload_enabled(enabled)?;
        Ok(self.announce().await)
    }

    pub async fn on_auto_reload_seconds_input(
        &self,
        raw: &str,
    ) -> Result<PublishReport, SurfaceError> {
        self.settings.set_auto_reload_seconds_raw(raw)?;
        Ok(self.announce().await)
    }

    pub fn subscribe(&self, capacity: usize) -> BusSubscription {
        self.bus.subscribe(capacity)
    }

    /// Applies deliveries until the subscription ends.
    pub async fn run(&self, mut subscription: BusSubscription) {
        while let Some(delivery) = subscription.recv().await {
            self.apply(&delivery);
        }
        debug!("panel subscription closed");
    }

    fn render(&self, payload: &ScorePayload) -> Result<(), SurfaceError> {
        self.window
            .set_value(FONT_SIZE_INPUT_ID, &payload.font_size_px.to_string())?;
        self.window
            .set_font_size(SCORE_DISPLAY_ID, payload.font_size_px)?;
        self.window
            .set_text(SCORE_DISPLAY_ID, &payload.display_text())
    }

    async fn announce(&self) -> PublishReport {
        self.bus.publish(BusEvent::SettingsChanged).await
    }
}
