//! Origin-scoped state store.
//!
//! Values are plain strings shared by every context attached to the same
//! [`OriginStorage`]; a write from one context raises a change notification in
//! every other context, never in the writer itself.

mod backend;
mod keys;
mod settings;

pub use backend::{
    external_writer, ContextStorage, KeyValueStore, OriginStorage, StorageChange, StorageListener,
};
pub use keys::StorageKeys;
pub use settings::{parse_payload, SettingsStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialize(String),
    #[error("write to '{key}' blocked by host")]
    WriteBlocked { key: String },
}
