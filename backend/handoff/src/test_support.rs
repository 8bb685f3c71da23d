//! Test doubles and a wired-up coordinator for the handoff flows.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use regionhop_core::{
    AgentData, AgentId, AgentUpdate, CircuitDescriptor, ClientEvent, ClientNotifier, CreateAgentResponse,
    CrossedRegion, EnableSimulator, EstablishAgentCommunication, RegionDescriptor, RegionHandle,
    RegionId, SimulationTransport, TeleportFinish, TeleportFlags,
};
use regionhop_eventqueue::EventQueue;
use regionhop_grid::StaticGrid;

use crate::coordinator::{CoordinatorSettings, HandoffCoordinator};

pub fn region(name: &str, x: i32, y: i32) -> RegionDescriptor {
    RegionDescriptor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        loc_x: x,
        loc_y: y,
        size_x: 256,
        size_y: 256,
        endpoint: "127.0.0.1:9000".parse().unwrap(),
        server_uri: format!("http://{name}.sim:9000"),
        access: 13,
    }
}

pub fn circuit(agent: AgentId) -> CircuitDescriptor {
    CircuitDescriptor::new(agent, Uuid::new_v4())
}

/// Short enough to keep timeout tests quick.
pub fn test_settings() -> CoordinatorSettings {
    CoordinatorSettings {
        callback_timeout: Duration::from_millis(300),
        establish_delay: Duration::from_millis(5),
        default_draw_distance: 256,
    }
}

#[derive(Debug, Clone)]
pub struct CreateCall {
    pub region: RegionId,
    pub caps_path: String,
    pub caps_password: Option<String>,
    pub teleport_flags: TeleportFlags,
    pub with_agent_data: bool,
}

#[derive(Debug, Default)]
struct TransportState {
    creates: Vec<CreateCall>,
    updates: Vec<(RegionId, AgentUpdate)>,
    closes: Vec<RegionId>,
    retrieves: Vec<RegionId>,
    rejected_creates: HashSet<RegionId>,
    rejected_updates: HashSet<RegionId>,
    failing_updates: HashSet<RegionId>,
    responses: HashMap<RegionId, CreateAgentResponse>,
    present: HashSet<RegionId>,
    create_delay: Option<Duration>,
}

/// Records every call and answers from a script.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    state: Mutex<TransportState>,
}

impl RecordingTransport {
    pub fn reject_create(&self, region: RegionId) {
        self.state.lock().unwrap().rejected_creates.insert(region);
    }

    pub fn reject_update(&self, region: RegionId) {
        self.state.lock().unwrap().rejected_updates.insert(region);
    }

    /// Make updates to `region` fail at the transport level.
    pub fn fail_update(&self, region: RegionId) {
        self.state.lock().unwrap().failing_updates.insert(region);
    }

    pub fn respond_with(&self, region: RegionId, response: CreateAgentResponse) {
        self.state.lock().unwrap().responses.insert(region, response);
    }

    /// Every create takes `delay` before it is answered.
    pub fn slow_create(&self, delay: Duration) {
        self.state.lock().unwrap().create_delay = Some(delay);
    }

    /// Presence queries for `region` will find the agent.
    pub fn mark_present(&self, region: RegionId) {
        self.state.lock().unwrap().present.insert(region);
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn updates(&self) -> Vec<(RegionId, AgentUpdate)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn closed(&self) -> Vec<RegionId> {
        self.state.lock().unwrap().closes.clone()
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates.len()
    }

    pub fn update_count(&self) -> usize {
        self.state.lock().unwrap().updates.len()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes.len()
    }

    pub fn retrieve_count(&self) -> usize {
        self.state.lock().unwrap().retrieves.len()
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.creates.len() + state.updates.len() + state.closes.len() + state.retrieves.len()
    }
}

#[async_trait]
impl SimulationTransport for RecordingTransport {
    async fn create_agent(
        &self,
        destination: &RegionDescriptor,
        circuit: &CircuitDescriptor,
        teleport_flags: TeleportFlags,
        agent_data: Option<&AgentData>,
    ) -> Result<CreateAgentResponse> {
        let delay = self.state.lock().unwrap().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.creates.push(CreateCall {
            region: destination.id,
            caps_path: circuit.caps_path.clone(),
            caps_password: circuit.caps_password().map(str::to_string),
            teleport_flags,
            with_agent_data: agent_data.is_some(),
        });
        if state.rejected_creates.contains(&destination.id) {
            return Ok(CreateAgentResponse::rejected("region full"));
        }
        Ok(state
            .responses
            .get(&destination.id)
            .cloned()
            .unwrap_or_else(CreateAgentResponse::accepted))
    }

    async fn update_agent(&self, destination: &RegionDescriptor, update: &AgentUpdate) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((destination.id, update.clone()));
        if state.failing_updates.contains(&destination.id) {
            return Err(anyhow!("connection reset by {}", destination.name));
        }
        Ok(!state.rejected_updates.contains(&destination.id))
    }

    async fn close_agent(&self, destination: &RegionDescriptor, _agent_id: AgentId) -> Result<bool> {
        self.state.lock().unwrap().closes.push(destination.id);
        Ok(true)
    }

    async fn retrieve_agent(
        &self,
        destination: &RegionDescriptor,
        agent_id: AgentId,
    ) -> Result<Option<AgentData>> {
        let mut state = self.state.lock().unwrap();
        state.retrieves.push(destination.id);
        Ok(state
            .present
            .contains(&destination.id)
            .then(|| AgentData::new(agent_id)))
    }
}

/// A client that is never reachable.
#[derive(Debug, Default)]
pub struct UnreachableClient;

#[async_trait]
impl ClientNotifier for UnreachableClient {
    async fn enable_simulator(&self, _agent_id: AgentId, _event: EnableSimulator) -> Result<()> {
        Err(anyhow!("client gone"))
    }

    async fn establish_agent_communication(
        &self,
        _agent_id: AgentId,
        _event: EstablishAgentCommunication,
    ) -> Result<()> {
        Err(anyhow!("client gone"))
    }

    async fn teleport_finish(&self, _agent_id: AgentId, _event: TeleportFinish) -> Result<()> {
        Err(anyhow!("client gone"))
    }

    async fn cross_region(&self, _agent_id: AgentId, _event: CrossedRegion) -> Result<()> {
        Err(anyhow!("client gone"))
    }
}

/// A coordinator wired to a static grid, a recording transport and an event queue.
pub struct Harness {
    pub coordinator: HandoffCoordinator,
    pub transport: Arc<RecordingTransport>,
    pub events: EventQueue,
    pub regions: Vec<RegionDescriptor>,
}

impl Harness {
    pub fn new(regions: Vec<RegionDescriptor>) -> Self {
        Self::build(regions, true, None)
    }

    pub fn without_transport(regions: Vec<RegionDescriptor>) -> Self {
        Self::build(regions, false, None)
    }

    pub fn with_notifier(regions: Vec<RegionDescriptor>, notifier: Arc<dyn ClientNotifier>) -> Self {
        Self::build(regions, true, Some(notifier))
    }

    fn build(
        regions: Vec<RegionDescriptor>,
        with_transport: bool,
        notifier: Option<Arc<dyn ClientNotifier>>,
    ) -> Self {
        let grid = Arc::new(StaticGrid::new(regions.clone(), 1));
        let transport = Arc::new(RecordingTransport::default());
        let events = EventQueue::new();

        let notifier: Arc<dyn ClientNotifier> = match notifier {
            Some(notifier) => notifier,
            None => Arc::new(events.clone()),
        };

        let mut builder = HandoffCoordinator::builder()
            .directory(grid.clone())
            .topology(grid)
            .notifier(notifier)
            .settings(test_settings());
        if with_transport {
            builder = builder.transport(transport.clone());
        }

        Self {
            coordinator: builder.build(),
            transport,
            events,
            regions,
        }
    }

    pub fn region(&self, name: &str) -> RegionDescriptor {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no region named {name}"))
    }

    pub fn handle(&self, name: &str) -> RegionHandle {
        self.region(name).handle()
    }

    /// Play the destination region: once the client is told about `trigger`,
    /// send `reply` to the coordinator as if it came from that region. The
    /// task yields the triggering event.
    pub async fn reply_on(
        &self,
        agent: AgentId,
        trigger: &'static str,
        reply: &'static str,
    ) -> JoinHandle<Option<ClientEvent>> {
        let mut rx = self.events.subscribe(agent).await;
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if event.name() == trigger {
                    coordinator
                        .dispatch(json!({
                            "Method": reply,
                            "AgentID": agent,
                            "RequestingRegion": event.region_handle(),
                        }))
                        .await;
                    return Some(event);
                }
            }
            None
        })
    }
}
