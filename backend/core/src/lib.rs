pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::HandoffBus;
pub use error::HandoffError;
pub use event::{
    ClientEvent, CrossedRegion, EnableSimulator, EstablishAgentCommunication, TeleportFinish,
};
pub use message::{parse_inbound, Envelope, EnvelopeError, HandoffRequest, InboundMessage, InboundRequest};
pub use traits::{
    ClientNotifier, Component, CreateAgentResponse, NeighborTopology, RegionDirectory,
    SimulationTransport,
};
pub use types::{
    AgentData, AgentId, AgentPosition, AgentUpdate, CircuitDescriptor, GridCoords,
    PositionSnapshot, RegionDescriptor, RegionHandle, RegionId, TeleportFlags, Vector3,
    CAPS_PASSWORD_KEY, REGION_UNIT,
};
