use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{
    AgentData, AgentId, AgentPosition, CircuitDescriptor, RegionHandle, RegionId, TeleportFlags,
    Vector3,
};

/// Raw inbound message as it arrives on the bus: a method-tagged key/value map.
pub type InboundMessage = Value;

/// Why an inbound message was dropped.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("message has no Method")]
    MissingMethod,

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("malformed {method} message: {detail}")]
    Malformed { method: String, detail: String },
}

/// Method-tagged outer shape shared by all handoff messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "AgentID")]
    pub agent_id: AgentId,
    #[serde(rename = "RequestingRegion")]
    pub requesting_region: RegionHandle,
    #[serde(rename = "Message", default)]
    pub message: Value,
}

/// A parsed handoff request, addressed to one agent by one region.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub agent_id: AgentId,
    pub requesting_region: RegionHandle,
    pub request: HandoffRequest,
}

#[derive(Debug, Clone)]
pub enum HandoffRequest {
    /// Region → coordinator only; never forwarded to the client.
    EnableChildAgents {
        draw_distance: u32,
        circuit: CircuitDescriptor,
    },
    DisableSimulator {
        kill_client: bool,
    },
    ArrivedAtDestination,
    CancelTeleport,
    SendChildAgentUpdate {
        position: AgentPosition,
        region: RegionId,
    },
    TeleportAgent {
        destination: RegionId,
        teleport_flags: TeleportFlags,
        draw_distance: u32,
        circuit: CircuitDescriptor,
        agent_data: AgentData,
    },
    CrossAgent {
        region: RegionId,
        position: Vector3,
        velocity: Vector3,
        circuit: CircuitDescriptor,
        agent_data: AgentData,
    },
}

impl HandoffRequest {
    pub fn method(&self) -> &'static str {
        match self {
            HandoffRequest::EnableChildAgents { .. } => "EnableChildAgents",
            HandoffRequest::DisableSimulator { .. } => "DisableSimulator",
            HandoffRequest::ArrivedAtDestination => "ArrivedAtDestination",
            HandoffRequest::CancelTeleport => "CancelTeleport",
            HandoffRequest::SendChildAgentUpdate { .. } => "SendChildAgentUpdate",
            HandoffRequest::TeleportAgent { .. } => "TeleportAgent",
            HandoffRequest::CrossAgent { .. } => "CrossAgent",
        }
    }
}

/// Only the region ID of a peer-supplied descriptor is ever read; the rest is
/// re-resolved from the directory.
#[derive(Debug, Deserialize)]
struct RegionRef {
    #[serde(rename = "RegionID")]
    id: RegionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnableChildAgentsBody {
    draw_distance: u32,
    circuit: CircuitDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DisableSimulatorBody {
    #[serde(default)]
    kill_client: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChildAgentUpdateBody {
    agent_pos: AgentPosition,
    region: RegionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TeleportAgentBody {
    region: RegionRef,
    #[serde(default)]
    teleport_flags: TeleportFlags,
    draw_distance: u32,
    circuit: CircuitDescriptor,
    agent_data: AgentData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CrossAgentBody {
    pos: Vector3,
    vel: Vector3,
    region: RegionRef,
    circuit: CircuitDescriptor,
    agent_data: AgentData,
}

impl Envelope {
    /// Decode the method-specific payload.
    pub fn into_request(self) -> Result<InboundRequest, EnvelopeError> {
        let method = self.method.clone();
        let request = match self.method.as_str() {
            "EnableChildAgents" => {
                let body: EnableChildAgentsBody = body(&method, self.message)?;
                HandoffRequest::EnableChildAgents {
                    draw_distance: body.draw_distance,
                    circuit: body.circuit,
                }
            }
            "DisableSimulator" => {
                let body: DisableSimulatorBody = if self.message.is_null() {
                    DisableSimulatorBody { kill_client: false }
                } else {
                    body(&method, self.message)?
                };
                HandoffRequest::DisableSimulator {
                    kill_client: body.kill_client,
                }
            }
            "ArrivedAtDestination" => HandoffRequest::ArrivedAtDestination,
            "CancelTeleport" => HandoffRequest::CancelTeleport,
            "SendChildAgentUpdate" => {
                let body: ChildAgentUpdateBody = body(&method, self.message)?;
                HandoffRequest::SendChildAgentUpdate {
                    position: body.agent_pos,
                    region: body.region,
                }
            }
            "TeleportAgent" => {
                let body: TeleportAgentBody = body(&method, self.message)?;
                HandoffRequest::TeleportAgent {
                    destination: body.region.id,
                    teleport_flags: body.teleport_flags,
                    draw_distance: body.draw_distance,
                    circuit: body.circuit,
                    agent_data: body.agent_data,
                }
            }
            "CrossAgent" => {
                let body: CrossAgentBody = body(&method, self.message)?;
                HandoffRequest::CrossAgent {
                    region: body.region.id,
                    position: body.pos,
                    velocity: body.vel,
                    circuit: body.circuit,
                    agent_data: body.agent_data,
                }
            }
            _ => return Err(EnvelopeError::UnknownMethod(method)),
        };

        Ok(InboundRequest {
            agent_id: self.agent_id,
            requesting_region: self.requesting_region,
            request,
        })
    }
}

fn body<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, EnvelopeError> {
    serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed {
        method: method.to_string(),
        detail: e.to_string(),
    })
}

/// Parse a raw inbound message into a typed request.
pub fn parse_inbound(message: InboundMessage) -> Result<InboundRequest, EnvelopeError> {
    let method = match message.get("Method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => return Err(EnvelopeError::MissingMethod),
    };
    let envelope: Envelope =
        serde_json::from_value(message).map_err(|e| EnvelopeError::Malformed {
            method,
            detail: e.to_string(),
        })?;
    envelope.into_request()
}
