use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{RegionDescriptor, RegionHandle, TeleportFlags, Vector3};

/// Location id sent with a teleport finish; the client treats 4 as "arbitrary location".
pub const TELEPORT_LOCATION_ID: u32 = 4;

/// Asks the client to open a circuit to a (child) region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableSimulator {
    pub region_handle: RegionHandle,
    pub endpoint: SocketAddr,
    pub size_x: u32,
    pub size_y: u32,
    pub requesting_region: RegionHandle,
}

impl EnableSimulator {
    pub fn for_region(region: &RegionDescriptor, requesting_region: RegionHandle) -> Self {
        Self {
            region_handle: region.handle(),
            endpoint: region.endpoint,
            size_x: region.size_x,
            size_y: region.size_y,
            requesting_region,
        }
    }
}

/// Tells the client the seed capability of a region it already has a circuit to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstablishAgentCommunication {
    pub region_handle: RegionHandle,
    pub endpoint: SocketAddr,
    pub seed_capability: String,
    pub size_x: u32,
    pub size_y: u32,
    pub requesting_region: RegionHandle,
}

/// Instructs the client to complete a teleport into the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleportFinish {
    pub region_handle: RegionHandle,
    pub access: u8,
    pub endpoint: SocketAddr,
    pub seed_capability: String,
    pub location_id: u32,
    pub teleport_flags: TeleportFlags,
    pub size_x: u32,
    pub size_y: u32,
    pub requesting_region: RegionHandle,
}

/// Instructs the client to hand its movement over to the adjacent region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossedRegion {
    pub region_handle: RegionHandle,
    pub position: Vector3,
    pub velocity: Vector3,
    pub endpoint: SocketAddr,
    pub seed_capability: String,
    pub session_id: Uuid,
    pub size_x: u32,
    pub size_y: u32,
    pub requesting_region: RegionHandle,
}

/// Any message delivered to a connected client through its event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", content = "body")]
pub enum ClientEvent {
    EnableSimulator(EnableSimulator),
    EstablishAgentCommunication(EstablishAgentCommunication),
    TeleportFinish(TeleportFinish),
    CrossedRegion(CrossedRegion),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::EnableSimulator(_) => "EnableSimulator",
            ClientEvent::EstablishAgentCommunication(_) => "EstablishAgentCommunication",
            ClientEvent::TeleportFinish(_) => "TeleportFinish",
            ClientEvent::CrossedRegion(_) => "CrossedRegion",
        }
    }

    /// Handle of the region the event points the client at.
    pub fn region_handle(&self) -> RegionHandle {
        match self {
            ClientEvent::EnableSimulator(e) => e.region_handle,
            ClientEvent::EstablishAgentCommunication(e) => e.region_handle,
            ClientEvent::TeleportFinish(e) => e.region_handle,
            ClientEvent::CrossedRegion(e) => e.region_handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_message_tag() {
        let event = ClientEvent::EnableSimulator(EnableSimulator {
            region_handle: RegionHandle::new(42),
            endpoint: "127.0.0.1:9000".parse().unwrap(),
            size_x: 256,
            size_y: 256,
            requesting_region: RegionHandle::new(7),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["message"], "EnableSimulator");
        assert_eq!(json["body"]["regionHandle"], 42);
        assert_eq!(event.name(), "EnableSimulator");
        assert_eq!(event.region_handle(), RegionHandle::new(42));
    }
}
