use scorebridge_state_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface window is closed")]
    Closed,
    #[error("surface window rejected the write")]
    Blocked,
    #[error("element '{id}' not present in surface document")]
    ElementMissing { id: String },
    #[error("window host refused to open '{name}': {reason}")]
    OpenRejected { name: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SurfaceError {
    pub fn missing(id: impl Into<String>) -> Self {
        Self::ElementMissing { id: id.into() }
    }
}
