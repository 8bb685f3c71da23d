use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::InboundMessage;

/// Default channel buffer size for inbound handoff messages.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// Message bus carrying inbound handoff messages from region peers to the coordinator.
///
/// Delivery is fire-and-forget: senders never see the outcome of a message.
pub struct HandoffBus {
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub inbound_rx: Option<mpsc::Receiver<InboundMessage>>,
}

impl HandoffBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "HandoffBus initialized");
        Self {
            inbound_tx,
            inbound_rx: Some(inbound_rx),
        }
    }

    /// A sender handle for a region peer.
    pub fn sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    /// Take the inbound receiver (can only be called once).
    pub fn take_inbound_rx(&mut self) -> Option<mpsc::Receiver<InboundMessage>> {
        debug!("Inbound receiver taken");
        self.inbound_rx.take()
    }
}

impl Default for HandoffBus {
    fn default() -> Self {
        Self::new()
    }
}
