//! Cross-context bus.
//!
//! A publish fans out to an ordered list of transports: the origin-scoped
//! broadcast channel (only reaches contexts listening right now) and the
//! storage write-through (reaches other contexts via change notifications).
//! Either may be missing or failing; receivers deduplicate by payload.

mod bus;
mod channel;
mod transport;
mod wire;

pub use bus::{BusSubscription, CrossContextBus, PayloadDeduper, PublishReport};
pub use channel::{ChannelEndpoint, ChannelHub, ChannelListener};
pub use transport::{ChannelTransport, StorageTransport, Transport};
pub use wire::WireMessage;

use scorebridge_core_types::ScorePayload;
use scorebridge_state_store::StoreError;
use thiserror::Error;

/// Logical event carried by the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    ScoreUpdate(ScorePayload),
    /// Carries no values; receivers re-read the store.
    SettingsChanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Primary,
    Storage,
}

impl TransportKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Primary => "broadcast",
            TransportKind::Storage => "storage",
        }
    }
}

/// An incoming event and the transport that carried it (diagnostics only).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub event: BusEvent,
    pub via: TransportKind,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to encode message: {0}")]
    Encode(String),
    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}
