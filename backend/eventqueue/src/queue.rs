//! Client event queue.
//!
//! Buffers protocol messages per agent until the client's long-poll (or any
//! other consumer) attaches, then streams them through an unbounded channel.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace, warn};

use regionhop_core::{
    AgentId, ClientEvent, ClientNotifier, CrossedRegion, EnableSimulator,
    EstablishAgentCommunication, TeleportFinish,
};

pub type EventSender = mpsc::UnboundedSender<ClientEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

/// Events held for a client with no live subscriber.
const MAX_PENDING_PER_AGENT: usize = 512;

#[derive(Debug, Default)]
struct AgentQueue {
    pending: VecDeque<ClientEvent>,
    subscriber: Option<EventSender>,
}

/// Per-agent event queues.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    queues: Arc<RwLock<HashMap<AgentId, AgentQueue>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer for an agent. Buffered events are delivered first;
    /// a previous subscriber is replaced.
    pub async fn subscribe(&self, agent_id: AgentId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queues = self.queues.write().await;
        let queue = queues.entry(agent_id).or_default();
        while let Some(event) = queue.pending.pop_front() {
            // Receiver is still in hand, so this cannot fail.
            let _ = tx.send(event);
        }
        queue.subscriber = Some(tx);
        debug!(agent_id = %agent_id, "Client event subscriber attached");
        rx
    }

    /// Queue an event for an agent.
    pub async fn enqueue(&self, agent_id: AgentId, event: ClientEvent) {
        let mut queues = self.queues.write().await;
        let queue = queues.entry(agent_id).or_default();
        trace!(agent_id = %agent_id, event = event.name(), "Enqueue client event");

        if let Some(tx) = &queue.subscriber {
            match tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => {
                    debug!(agent_id = %agent_id, "Client event subscriber gone; buffering");
                    queue.subscriber = None;
                    queue.pending.push_back(event);
                }
            }
        } else {
            queue.pending.push_back(event);
        }

        if queue.pending.len() > MAX_PENDING_PER_AGENT {
            if let Some(dropped) = queue.pending.pop_front() {
                warn!(agent_id = %agent_id, event = dropped.name(), "Client event queue full; dropped oldest");
            }
        }
    }

    /// Take every buffered event for an agent.
    pub async fn drain(&self, agent_id: AgentId) -> Vec<ClientEvent> {
        let mut queues = self.queues.write().await;
        match queues.get_mut(&agent_id) {
            Some(queue) => queue.pending.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ClientNotifier for EventQueue {
    async fn enable_simulator(&self, agent_id: AgentId, event: EnableSimulator) -> Result<()> {
        self.enqueue(agent_id, ClientEvent::EnableSimulator(event)).await;
        Ok(())
    }

    async fn establish_agent_communication(
        &self,
        agent_id: AgentId,
        event: EstablishAgentCommunication,
    ) -> Result<()> {
        self.enqueue(agent_id, ClientEvent::EstablishAgentCommunication(event))
            .await;
        Ok(())
    }

    async fn teleport_finish(&self, agent_id: AgentId, event: TeleportFinish) -> Result<()> {
        self.enqueue(agent_id, ClientEvent::TeleportFinish(event)).await;
        Ok(())
    }

    async fn cross_region(&self, agent_id: AgentId, event: CrossedRegion) -> Result<()> {
        self.enqueue(agent_id, ClientEvent::CrossedRegion(event)).await;
        Ok(())
    }
}
