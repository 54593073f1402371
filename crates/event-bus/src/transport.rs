use async_trait::async_trait;
use scorebridge_state_store::{parse_payload, SettingsStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{BusError, BusEvent, ChannelEndpoint, Delivery, TransportKind, WireMessage};

/// One delivery path of the bus.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn publish(&self, event: &BusEvent) -> Result<(), BusError>;

    /// Forwards events from other contexts into `sink` until it closes.
    fn forward(&self, sink: mpsc::Sender<Delivery>) -> JoinHandle<()>;
}

/// Primary transport over the origin broadcast channel.
pub struct ChannelTransport {
    endpoint: ChannelEndpoint,
}

impl ChannelTransport {
    pub fn new(endpoint: ChannelEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Primary
    }

    async fn publish(&self, event: &BusEvent) -> Result<(), BusError> {
        self.endpoint.post(&WireMessage::from(event))
    }

    fn forward(&self, sink: mpsc::Sender<Delivery>) -> JoinHandle<()> {
        let mut listener = self.endpoint.listen();
        tokio::spawn(async move {
            while let Some(message) = listener.recv().await {
                let delivery = Delivery {
                    event: message.into_event(),
                    via: TransportKind::Primary,
                };
                if sink.send(delivery).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Fallback transport: score updates are written through to the payload key,
/// and any settings-key write elsewhere surfaces as `SettingsChanged`.
pub struct StorageTransport {
    settings: SettingsStore,
}

impl StorageTransport {
    pub fn new(settings: SettingsStore) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Transport for StorageTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Storage
    }

    async fn publish(&self, event: &BusEvent) -> Result<(), BusError> {
        match event {
            BusEvent::ScoreUpdate(payload) => Ok(self.settings.write_payload(payload)?),
            // The settings write that preceded the publish is the notification.
            BusEvent::SettingsChanged => Ok(()),
        }
    }

    fn forward(&self, sink: mpsc::Sender<Delivery>) -> JoinHandle<()> {
        let mut listener = self.settings.store().listen();
        let keys = self.settings.keys().clone();
        tokio::spawn(async move {
            while let Some(change) = listener.recv().await {
                let event = if change.key == keys.score_payload {
                    match change.new_value.as_deref().and_then(parse_payload) {
                        Some(payload) => BusEvent::ScoreUpdate(payload),
                        None => continue,
                    }
                } else if keys.is_settings_key(&change.key) {
                    BusEvent::SettingsChanged
                } else {
                    debug!(key = %change.key, "ignoring unrelated storage change");
                    continue;
                };
                let delivery = Delivery {
                    event,
                    via: TransportKind::Storage,
                };
                if sink.send(delivery).await.is_err() {
                    break;
                }
            }
        })
    }
}
