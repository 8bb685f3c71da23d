//! `regionhop-handoff`: the agent handoff coordinator.
//!
//! Provides:
//! - `HandoffCoordinator`: child-agent enablement, teleports, crossings and
//!   child position fan-out over pluggable grid collaborators
//! - `dispatch`: routing of raw inbound messages to those flows
//! - `HandoffService`: a `Component` that drains the inbound bus; `launch`
//!   wires it to a bus sized from config

pub mod child_update;
pub mod coordinator;
pub mod crossing;
pub mod dispatcher;
pub mod neighbors;
pub mod service;
pub mod teleport;

#[cfg(test)]
mod test_support;

pub use coordinator::{
    Collaborators, CoordinatorBuilder, CoordinatorSettings, HandoffCoordinator, TransferOutcome,
};
pub use crossing::CrossRequest;
pub use dispatcher::DispatchOutcome;
pub use neighbors::{FanOutReport, InformedNeighbor, NeighborResult};
pub use service::{HandoffService, RunningService};
pub use teleport::TeleportRequest;
