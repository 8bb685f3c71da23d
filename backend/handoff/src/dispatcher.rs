//! Inbound message routing.
//!
//! Best-effort: malformed or unknown messages are dropped, and the sender
//! never sees an error.

use tracing::{debug, warn};

use regionhop_core::{parse_inbound, HandoffRequest, InboundMessage, InboundRequest};

use crate::coordinator::HandoffCoordinator;
use crate::crossing::CrossRequest;
use crate::teleport::TeleportRequest;

/// What became of one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dropped,
    Handled { method: &'static str, success: bool },
}

impl HandoffCoordinator {
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let inbound = match parse_inbound(message) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!(error = %e, "Dropping inbound message");
                return DispatchOutcome::Dropped;
            }
        };
        let method = inbound.request.method();
        let success = self.handle(inbound).await;
        DispatchOutcome::Handled { method, success }
    }

    async fn handle(&self, inbound: InboundRequest) -> bool {
        let InboundRequest {
            agent_id,
            requesting_region,
            request,
        } = inbound;
        let agent = self.sessions.agent(agent_id).await;
        debug!(agent_id = %agent_id, region = %requesting_region, method = request.method(), "Dispatching");

        match request {
            HandoffRequest::EnableChildAgents {
                draw_distance,
                circuit,
            } => match self
                .enable_child_agents(agent_id, requesting_region, draw_distance, &circuit)
                .await
            {
                Ok(report) => report.all_succeeded(),
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "EnableChildAgents failed");
                    false
                }
            },
            HandoffRequest::DisableSimulator { kill_client } => {
                if agent.set_disabled(requesting_region, true).await == Some(false) && !kill_client {
                    agent.remove_region(requesting_region).await;
                }
                true
            }
            HandoffRequest::ArrivedAtDestination => {
                agent.transfer().mark_arrived();
                agent.set_disabled(requesting_region, false).await;
                true
            }
            HandoffRequest::CancelTeleport => {
                agent.transfer().request_cancel();
                agent.set_disabled(requesting_region, false).await;
                true
            }
            HandoffRequest::SendChildAgentUpdate { position, region } => {
                let success = match self.send_child_agent_update(&position, region).await {
                    Ok(report) => report.all_succeeded(),
                    Err(e) => {
                        warn!(agent_id = %agent_id, error = %e, "SendChildAgentUpdate failed");
                        false
                    }
                };
                agent.set_disabled(requesting_region, false).await;
                success
            }
            HandoffRequest::TeleportAgent {
                destination,
                teleport_flags,
                draw_distance,
                circuit,
                agent_data,
            } => {
                agent.set_disabled(requesting_region, false).await;
                self.teleport_agent(TeleportRequest {
                    agent_id,
                    requesting_region,
                    destination,
                    teleport_flags,
                    draw_distance,
                    circuit,
                    agent_data,
                })
                .await
                .map(|outcome| outcome.is_success())
                .unwrap_or(false)
            }
            HandoffRequest::CrossAgent {
                region,
                position,
                velocity,
                circuit,
                agent_data,
            } => {
                agent.set_disabled(requesting_region, false).await;
                self.cross_agent(CrossRequest {
                    agent_id,
                    requesting_region,
                    destination: region,
                    position,
                    velocity,
                    circuit,
                    agent_data,
                })
                .await
                .map(|outcome| outcome.is_success())
                .unwrap_or(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{region, Harness};
    use regionhop_core::RegionDescriptor;
    use regionhop_sessions::TransferFlags;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn layout() -> Vec<RegionDescriptor> {
        vec![region("home", 10, 10), region("east", 11, 10)]
    }

    fn circuit_json(agent: Uuid) -> Value {
        json!({ "AgentID": agent, "SessionID": Uuid::new_v4() })
    }

    fn message(method: &str, agent: Uuid, from: &Harness, region: &str, body: Value) -> Value {
        json!({
            "Method": method,
            "AgentID": agent,
            "RequestingRegion": from.handle(region),
            "Message": body,
        })
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages_are_dropped() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        assert_eq!(harness.coordinator.dispatch(json!({"AgentID": agent})).await, DispatchOutcome::Dropped);
        assert_eq!(
            harness.coordinator.dispatch(message("Dance", agent, &harness, "home", Value::Null)).await,
            DispatchOutcome::Dropped
        );
        assert_eq!(
            harness
                .coordinator
                .dispatch(message("TeleportAgent", agent, &harness, "home", json!({"DrawDistance": 1})))
                .await,
            DispatchOutcome::Dropped
        );
        assert_eq!(harness.transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn enable_child_agents_routes_to_fan_out() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let outcome = harness
            .coordinator
            .dispatch(message(
                "EnableChildAgents",
                agent,
                &harness,
                "home",
                json!({"DrawDistance": 256, "Circuit": circuit_json(agent)}),
            ))
            .await;
        assert_eq!(
            outcome,
            DispatchOutcome::Handled { method: "EnableChildAgents", success: true }
        );
        assert_eq!(harness.transport.create_count(), 1);
    }

    #[tokio::test]
    async fn disable_without_kill_forgets_the_region() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let sessions = harness.coordinator.sessions().agent(agent).await;
        sessions.region_or_create(harness.handle("east")).await;

        harness
            .coordinator
            .dispatch(message("DisableSimulator", agent, &harness, "east", json!({"KillClient": false})))
            .await;
        assert!(sessions.region(harness.handle("east")).await.is_none());
    }

    #[tokio::test]
    async fn disable_with_kill_only_marks_disabled() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let sessions = harness.coordinator.sessions().agent(agent).await;
        sessions.region_or_create(harness.handle("east")).await;

        harness
            .coordinator
            .dispatch(message("DisableSimulator", agent, &harness, "east", json!({"KillClient": true})))
            .await;
        assert!(sessions.region(harness.handle("east")).await.unwrap().disabled);

        // An already-disabled session is left alone.
        harness
            .coordinator
            .dispatch(message("DisableSimulator", agent, &harness, "east", json!({"KillClient": false})))
            .await;
        assert!(sessions.region(harness.handle("east")).await.is_some());
    }

    #[tokio::test]
    async fn arrival_and_cancel_set_flags_and_reenable() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let sessions = harness.coordinator.sessions().agent(agent).await;
        sessions.region_or_create(harness.handle("east")).await;
        sessions.set_disabled(harness.handle("east"), true).await;
        let _transit = sessions.transfer().try_begin().unwrap();

        harness
            .coordinator
            .dispatch(message("ArrivedAtDestination", agent, &harness, "east", Value::Null))
            .await;
        harness
            .coordinator
            .dispatch(message("CancelTeleport", agent, &harness, "east", Value::Null))
            .await;

        assert_eq!(
            sessions.transfer().flags(),
            TransferFlags { in_transit: true, cancel_requested: true, callback_received: true }
        );
        assert!(!sessions.region(harness.handle("east")).await.unwrap().disabled);
    }

    #[tokio::test]
    async fn teleport_reduces_to_success_flag() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let reply = harness.reply_on(agent, "TeleportFinish", "ArrivedAtDestination").await;
        let outcome = harness
            .coordinator
            .dispatch(message(
                "TeleportAgent",
                agent,
                &harness,
                "home",
                json!({
                    "Region": { "RegionID": harness.region("east").id },
                    "TeleportFlags": 16,
                    "DrawDistance": 256,
                    "Circuit": circuit_json(agent),
                    "AgentData": { "AgentID": agent },
                }),
            ))
            .await;
        assert_eq!(outcome, DispatchOutcome::Handled { method: "TeleportAgent", success: true });
        reply.await.unwrap();
    }

    #[tokio::test]
    async fn failed_crossing_reduces_to_false() {
        let harness = Harness::new(layout());
        let agent = Uuid::new_v4();
        let outcome = harness
            .coordinator
            .dispatch(message(
                "CrossAgent",
                agent,
                &harness,
                "home",
                json!({
                    "Pos": { "x": 250.0, "y": 128.0, "z": 20.0 },
                    "Vel": { "x": 3.0, "y": 0.0, "z": 0.0 },
                    "Region": { "RegionID": harness.region("east").id },
                    "Circuit": circuit_json(agent),
                    "AgentData": { "AgentID": agent },
                }),
            ))
            .await;
        // No child agent at east yet.
        assert_eq!(outcome, DispatchOutcome::Handled { method: "CrossAgent", success: false });
    }
}
