use std::sync::Arc;

use scorebridge_core_types::ContextId;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::{BusError, WireMessage};

#[derive(Clone, Debug)]
struct Envelope {
    sender: ContextId,
    data: String,
}

/// Origin-scoped publish/subscribe channel, one per channel name.
///
/// Delivery is ephemeral: only endpoints listening at post time receive a
/// message, and the posting endpoint never hears its own messages.
pub struct ChannelHub {
    name: String,
    sender: broadcast::Sender<Envelope>,
}

impl ChannelHub {
    pub fn new(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            name: name.into(),
            sender,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(self: &Arc<Self>, context: ContextId) -> ChannelEndpoint {
        ChannelEndpoint {
            hub: Arc::clone(self),
            context,
        }
    }
}

/// One context's handle on a [`ChannelHub`].
#[derive(Clone)]
pub struct ChannelEndpoint {
    hub: Arc<ChannelHub>,
    context: ContextId,
}

impl ChannelEndpoint {
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn post(&self, message: &WireMessage) -> Result<(), BusError> {
        let data = serde_json::to_string(message).map_err(|err| BusError::Encode(err.to_string()))?;
        let envelope = Envelope {
            sender: self.context.clone(),
            data,
        };
        if self.hub.sender.send(envelope).is_err() {
            debug!(channel = %self.hub.name, "no listeners on channel");
        }
        Ok(())
    }

    pub fn listen(&self) -> ChannelListener {
        ChannelListener {
            rx: self.hub.sender.subscribe(),
            own: self.context.clone(),
            channel: self.hub.name.clone(),
        }
    }
}

pub struct ChannelListener {
    rx: broadcast::Receiver<Envelope>,
    own: ContextId,
    channel: String,
}

impl ChannelListener {
    /// Next decodable message from another context; malformed data is skipped.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.sender == self.own => continue,
                Ok(envelope) => match serde_json::from_str(&envelope.data) {
                    Ok(message) => return Some(message),
                    Err(err) => {
                        debug!(channel = %self.channel, %err, "dropping undecodable message");
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "channel listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn message_skips_sender() {
        let hub = ChannelHub::new("faceit-score", 16);
        let page = hub.join(ContextId::named("page"));
        let popup = hub.join(ContextId::named("popup"));
        let mut page_rx = page.listen();
        let mut popup_rx = popup.listen();

        page.post(&WireMessage::SettingsChanged).unwrap();

        assert_eq!(popup_rx.recv().await, Some(WireMessage::SettingsChanged));
        assert!(timeout(Duration::from_millis(20), page_rx.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn late_listener_misses_earlier_posts() {
        let hub = ChannelHub::new("faceit-score", 16);
        let page = hub.join(ContextId::named("page"));
        page.post(&WireMessage::SettingsChanged).unwrap();

        let mut late = hub.join(ContextId::named("tab")).listen();
        assert!(timeout(Duration::from_millis(20), late.recv())
            .await
            .is_err());
    }
}
