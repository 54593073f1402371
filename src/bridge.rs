//! Assembles the per-context components from a [`BridgeConfig`].

use std::sync::Arc;

use scorebridge_core_types::ContextId;
use scorebridge_display_surface::{
    SurfaceController, SurfaceDocument, SurfacePanel, SurfaceWindow, WindowHost,
};
use scorebridge_event_bus::{ChannelHub, CrossContextBus};
use scorebridge_scheduler::{
    AudioSink, PageHost, SchedulerError, Session, SessionParts, SilentSink, SoundNotifier,
};
use scorebridge_selector::ScoreResolver;
use scorebridge_state_store::{OriginStorage, SettingsStore};
use tracing::{info, warn};

use crate::config::BridgeConfig;

/// Origin-wide shared primitives every context attaches to.
pub struct Origin {
    pub storage: OriginStorage,
    pub channel: Option<Arc<ChannelHub>>,
}

impl Origin {
    pub fn in_memory(config: &BridgeConfig) -> Self {
        Self {
            storage: OriginStorage::in_memory(),
            channel: channel_for(config),
        }
    }

    /// File-backed store when a path is configured or derivable.
    pub fn open(config: &BridgeConfig) -> Self {
        let storage = match config.storage.resolved_path() {
            Some(path) => {
                info!(path = %path.display(), "using persistent origin storage");
                OriginStorage::open(path)
            }
            None => {
                warn!("no storage path available; settings will not persist");
                OriginStorage::in_memory()
            }
        };
        Self {
            storage,
            channel: channel_for(config),
        }
    }

    pub fn settings(&self, config: &BridgeConfig, context: &ContextId) -> SettingsStore {
        SettingsStore::new(
            Arc::new(self.storage.attach(context.clone())),
            config.storage.keys.clone(),
            config.defaults.clone(),
        )
    }

    pub fn bus(&self, context: ContextId, settings: SettingsStore) -> CrossContextBus {
        CrossContextBus::standard(context, self.channel.as_ref(), settings)
    }
}

fn channel_for(config: &BridgeConfig) -> Option<Arc<ChannelHub>> {
    config
        .channel
        .enabled
        .then(|| ChannelHub::new(config.channel.name.clone(), config.channel.capacity))
}

pub fn surface_document(config: &BridgeConfig) -> SurfaceDocument {
    let channel = config
        .channel
        .enabled
        .then(|| config.channel.name.clone());
    SurfaceDocument::new(config.storage.keys.clone(), channel).with_title(config.surface.title.clone())
}

/// Builds the page-context session.
pub fn page_session(
    config: &BridgeConfig,
    origin: &Origin,
    page: Arc<dyn PageHost>,
    windows: Arc<dyn WindowHost>,
    sink: Arc<dyn AudioSink>,
) -> Result<Arc<Session>, SchedulerError> {
    let context = ContextId::named("page");
    let settings = origin.settings(config, &context);
    let bus = origin.bus(context, settings.clone());
    let document = surface_document(config).render();
    let surface = SurfaceController::new(windows, config.surface.clone(), document);
    surface.attach_settings(settings.clone());
    Ok(Session::new(SessionParts {
        page,
        resolver: ScoreResolver::new(&config.selectors)?,
        settings,
        bus,
        surface,
        sound: SoundNotifier::new(sink),
        config: config.scheduler.clone(),
    }))
}

/// Builds the surface-context panel over an open window.
pub fn surface_panel(
    config: &BridgeConfig,
    origin: &Origin,
    window: Arc<dyn SurfaceWindow>,
) -> SurfacePanel {
    let context = ContextId::named("surface");
    let settings = origin.settings(config, &context);
    let bus = origin.bus(context, settings.clone());
    SurfacePanel::new(window, settings, bus)
}

/// Real playback when built with `rodio` and a clip is configured.
pub fn audio_sink(config: &BridgeConfig) -> Arc<dyn AudioSink> {
    #[cfg(feature = "rodio")]
    if let Some(clip) = &config.sound.clip {
        match scorebridge_scheduler::RodioSink::open(clip) {
            Ok(sink) => return Arc::new(sink),
            Err(err) => warn!(%err, "notification clip unavailable; sound disabled"),
        }
    }
    #[cfg(not(feature = "rodio"))]
    if config.sound.clip.is_some() {
        warn!("built without audio support; notification clip ignored");
    }
    Arc::new(SilentSink)
}
