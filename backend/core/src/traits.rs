use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::event::{CrossedRegion, EnableSimulator, EstablishAgentCommunication, TeleportFinish};
use crate::message::InboundMessage;
use crate::types::{
    AgentData, AgentId, AgentUpdate, CircuitDescriptor, GridCoords, RegionDescriptor, RegionId,
    TeleportFlags,
};

/// Trait for long-running regionhop components.
///
/// Each component consumes inbound messages from its channel and runs in its own Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Start the component's event loop, consuming from the given receiver.
    async fn start(&self, rx: mpsc::Receiver<InboundMessage>) -> Result<()>;
}

/// Grid directory: authoritative region descriptors.
#[async_trait]
pub trait RegionDirectory: Send + Sync {
    /// Look up the region whose origin is at the given world-meter position.
    async fn region_by_position(&self, x: u32, y: u32) -> Result<Option<RegionDescriptor>>;

    async fn region_by_id(&self, id: RegionId) -> Result<Option<RegionDescriptor>>;
}

/// Neighbor topology over the grid.
#[async_trait]
pub trait NeighborTopology: Send + Sync {
    /// All regions within `radius` meters of `region`. May include `region` itself.
    async fn neighbors(&self, region: &RegionDescriptor, radius: u32) -> Result<Vec<RegionDescriptor>>;

    /// Whether a region at `other` is out of view for an agent rooted at `root`.
    fn is_outside_view(&self, root: GridCoords, other: GridCoords) -> bool;
}

/// Typed answer of a destination to an agent-creation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateAgentResponse {
    pub accepted: bool,
    /// Canonical seed capability URL chosen by the destination, if it has one.
    pub capability_url: Option<String>,
    pub error_detail: Option<String>,
}

impl CreateAgentResponse {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            ..Default::default()
        }
    }

    pub fn accepted_with_capability(url: impl Into<String>) -> Self {
        Self {
            accepted: true,
            capability_url: Some(url.into()),
            error_detail: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            capability_url: None,
            error_detail: Some(reason.into()),
        }
    }
}

/// Simulation transport: materializes and updates agents on remote regions.
#[async_trait]
pub trait SimulationTransport: Send + Sync {
    async fn create_agent(
        &self,
        destination: &RegionDescriptor,
        circuit: &CircuitDescriptor,
        teleport_flags: TeleportFlags,
        agent_data: Option<&AgentData>,
    ) -> Result<CreateAgentResponse>;

    /// Returns `false` when the destination declined the update.
    async fn update_agent(&self, destination: &RegionDescriptor, update: &AgentUpdate) -> Result<bool>;

    async fn close_agent(&self, destination: &RegionDescriptor, agent_id: AgentId) -> Result<bool>;

    /// Presence query: the agent's state at `destination`, if it is there.
    async fn retrieve_agent(
        &self,
        destination: &RegionDescriptor,
        agent_id: AgentId,
    ) -> Result<Option<AgentData>>;
}

/// Delivers asynchronous protocol messages to a connected client.
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    async fn enable_simulator(&self, agent_id: AgentId, event: EnableSimulator) -> Result<()>;

    async fn establish_agent_communication(
        &self,
        agent_id: AgentId,
        event: EstablishAgentCommunication,
    ) -> Result<()>;

    async fn teleport_finish(&self, agent_id: AgentId, event: TeleportFinish) -> Result<()>;

    async fn cross_region(&self, agent_id: AgentId, event: CrossedRegion) -> Result<()>;
}
