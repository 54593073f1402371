use scorebridge_core_types::BridgeError;
use scorebridge_display_surface::SurfaceError;
use scorebridge_selector::SelectorError;
use scorebridge_state_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("page unavailable: {0}")]
    Page(String),
    #[error("audio playback rejected: {0}")]
    Audio(String),
    #[error("scheduler already running")]
    AlreadyRunning,
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    pub fn page(reason: impl Into<String>) -> Self {
        Self::Page(reason.into())
    }
}

impl From<SchedulerError> for BridgeError {
    fn from(value: SchedulerError) -> Self {
        BridgeError::new(value.to_string())
    }
}
