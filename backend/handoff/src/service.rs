//! Bus-driven handoff worker.
//!
//! Every inbound message is dispatched on its own task. Transfers are capped
//! by a semaphore; arrival, cancel and disable signals bypass it so a waiting
//! teleport can always be woken.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use regionhop_config::HandoffSettings;
use regionhop_core::{Component, HandoffBus, InboundMessage};

use crate::coordinator::HandoffCoordinator;
use crate::dispatcher::DispatchOutcome;

/// Methods that only flip flags and never wait on a peer.
const SIGNAL_METHODS: [&str; 3] = ["ArrivedAtDestination", "CancelTeleport", "DisableSimulator"];

fn is_signal(message: &InboundMessage) -> bool {
    message
        .get("Method")
        .and_then(Value::as_str)
        .is_some_and(|m| SIGNAL_METHODS.contains(&m))
}

/// A launched service: the sender region peers push envelopes into, and the
/// task running the worker loop. Dropping every sender stops the loop once
/// in-flight handoffs finish.
pub struct RunningService {
    pub sender: mpsc::Sender<InboundMessage>,
    pub handle: JoinHandle<Result<()>>,
}

pub struct HandoffService {
    coordinator: HandoffCoordinator,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl HandoffService {
    pub fn new(coordinator: HandoffCoordinator, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            coordinator,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn from_settings(coordinator: HandoffCoordinator, settings: &HandoffSettings) -> Self {
        Self::new(coordinator, settings.max_concurrent_handoffs())
    }

    /// Build the bus and the worker from `settings` and start the loop on its own task.
    pub fn launch(coordinator: HandoffCoordinator, settings: &HandoffSettings) -> Result<RunningService> {
        let mut bus = HandoffBus::with_buffer_size(settings.bus_buffer_size());
        let rx = bus
            .take_inbound_rx()
            .ok_or_else(|| anyhow!("handoff bus receiver already taken"))?;
        let sender = bus.sender();
        let service = Self::from_settings(coordinator, settings);
        let handle = tokio::spawn(async move { service.start(rx).await });
        Ok(RunningService { sender, handle })
    }

    pub fn coordinator(&self) -> &HandoffCoordinator {
        &self.coordinator
    }

    fn spawn_dispatch(&self, tasks: &mut JoinSet<DispatchOutcome>, message: InboundMessage) {
        let coordinator = self.coordinator.clone();
        if is_signal(&message) {
            tasks.spawn(async move { coordinator.dispatch(message).await });
            return;
        }
        let permits = self.permits.clone();
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return DispatchOutcome::Dropped;
            };
            coordinator.dispatch(message).await
        });
    }
}

fn reap(result: Result<DispatchOutcome, tokio::task::JoinError>) {
    match result {
        Ok(DispatchOutcome::Handled { method, success }) => {
            debug!(method, success, "Handoff message handled");
        }
        Ok(DispatchOutcome::Dropped) => {}
        Err(e) => error!(error = %e, "Handoff task panicked"),
    }
}

#[async_trait]
impl Component for HandoffService {
    fn name(&self) -> &str {
        "handoff"
    }

    async fn start(&self, mut rx: mpsc::Receiver<InboundMessage>) -> Result<()> {
        info!(max_concurrent = self.max_concurrent, "Handoff service started");
        let mut tasks = JoinSet::new();

        while let Some(message) = rx.recv().await {
            self.spawn_dispatch(&mut tasks, message);
            while let Some(done) = tasks.try_join_next() {
                reap(done);
            }
        }

        // Bus closed: let in-flight handoffs finish.
        while let Some(done) = tasks.join_next().await {
            reap(done);
        }
        info!("Handoff service stopped");
        Ok(())
    }
}
