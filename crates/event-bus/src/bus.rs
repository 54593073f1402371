use std::sync::Arc;

use scorebridge_core_types::{ContextId, ScorePayload};
use scorebridge_state_store::SettingsStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    BusEvent, ChannelEndpoint, ChannelHub, ChannelTransport, Delivery, StorageTransport,
    Transport, TransportKind,
};

/// Outcome of one publish across every transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: Vec<TransportKind>,
    pub failed: Vec<TransportKind>,
}

impl PublishReport {
    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }
}

/// Best-effort fan-out over an ordered list of transports.
#[derive(Clone)]
pub struct CrossContextBus {
    context: ContextId,
    transports: Vec<Arc<dyn Transport>>,
}

impl CrossContextBus {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            transports: Vec::new(),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Broadcast channel first when the host offers one, storage second.
    pub fn standard(
        context: ContextId,
        channel: Option<&Arc<ChannelHub>>,
        settings: SettingsStore,
    ) -> Self {
        let mut bus = Self::new(context.clone());
        match channel {
            Some(hub) => {
                let endpoint: ChannelEndpoint = hub.join(context);
                bus = bus.with_transport(Arc::new(ChannelTransport::new(endpoint)));
            }
            None => debug!("broadcast channel unavailable; storage transport only"),
        }
        bus.with_transport(Arc::new(StorageTransport::new(settings)))
    }

    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn transport_kinds(&self) -> Vec<TransportKind> {
        self.transports.iter().map(|t| t.kind()).collect()
    }

    /// Attempts every transport; a failing one never blocks the others and
    /// nothing is surfaced to the caller beyond the report.
    pub async fn publish(&self, event: BusEvent) -> PublishReport {
        let mut report = PublishReport::default();
        for transport in &self.transports {
            match transport.publish(&event).await {
                Ok(()) => report.delivered.push(transport.kind()),
                Err(err) => {
                    warn!(transport = transport.kind().name(), %err, "bus publish failed");
                    report.failed.push(transport.kind());
                }
            }
        }
        report
    }

    /// Merges every transport's incoming events into one stream.
    pub fn subscribe(&self, capacity: usize) -> BusSubscription {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let forwarders = self
            .transports
            .iter()
            .map(|t| t.forward(tx.clone()))
            .collect();
        BusSubscription { rx, forwarders }
    }
}

/// Merged receiver; dropping it stops the forwarders.
pub struct BusSubscription {
    rx: mpsc::Receiver<Delivery>,
    forwarders: Vec<JoinHandle<()>>,
}

impl BusSubscription {
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        for handle in &self.forwarders {
            handle.abort();
        }
    }
}

/// Drops score updates that would render the same as the last one applied.
#[derive(Debug, Default)]
pub struct PayloadDeduper {
    last: Option<ScorePayload>,
}

impl PayloadDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, payload: &ScorePayload) -> bool {
        if let Some(last) = &self.last {
            if last.same_display(payload) {
                return false;
            }
        }
        self.last = Some(payload.clone());
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
