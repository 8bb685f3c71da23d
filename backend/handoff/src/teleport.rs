//! Teleport: move the root agent to an arbitrary destination.
//!
//! Idle → in transit → awaiting callback → arrived | reconciled | canceled → idle.
//! The transit guard resets the agent's flags on every exit.

use tracing::{error, info, warn};

use regionhop_core::{
    event::TELEPORT_LOCATION_ID, AgentData, AgentId, CircuitDescriptor, HandoffError,
    RegionDescriptor, RegionHandle, RegionId, TeleportFinish, TeleportFlags,
};
use regionhop_logging::{HandoffEvent, HandoffEventLogger};
use regionhop_sessions::{AgentSessions, CancelPolicy, WaitOutcome};

use crate::coordinator::{HandoffCoordinator, TransferOutcome};

/// A teleport request as sent by the agent's current region.
#[derive(Debug, Clone)]
pub struct TeleportRequest {
    pub agent_id: AgentId,
    pub requesting_region: RegionHandle,
    pub destination: RegionId,
    pub teleport_flags: TeleportFlags,
    pub draw_distance: u32,
    pub circuit: CircuitDescriptor,
    pub agent_data: AgentData,
}

impl HandoffCoordinator {
    pub async fn teleport_agent(&self, request: TeleportRequest) -> Result<TransferOutcome, HandoffError> {
        let agent_id = request.agent_id;
        let destination = request.destination;
        let result = self.run_teleport(request).await;
        if let Err(e) = &result {
            if !e.is_soft() {
                error!(agent_id = %agent_id, error = %e, "Teleport failed");
            }
            HandoffEventLogger::log_event(
                agent_id,
                HandoffEvent::TransferFailed {
                    destination: destination.to_string(),
                    error_msg: e.to_string(),
                },
            );
        }
        result
    }

    async fn run_teleport(&self, request: TeleportRequest) -> Result<TransferOutcome, HandoffError> {
        let TeleportRequest {
            agent_id,
            requesting_region,
            destination,
            teleport_flags,
            draw_distance,
            circuit,
            mut agent_data,
        } = request;

        let transport = self.collaborators.transport()?;
        let agent = self.sessions.agent(agent_id).await;
        let Some(_transit) = agent.transfer().try_begin() else {
            warn!(agent_id = %agent_id, "Teleport requested during another transfer");
            return Err(HandoffError::TransferInProgress(agent_id));
        };

        let destination = self.region_by_id(destination).await?;
        HandoffEventLogger::log_event(
            agent_id,
            HandoffEvent::TeleportStarted {
                destination: destination.name.clone(),
            },
        );

        if agent_data.draw_distance <= 0.0 {
            agent_data.draw_distance = draw_distance as f32;
        }
        let informed = self
            .inform_client_of_neighbor(
                agent_id,
                requesting_region,
                circuit,
                &destination,
                teleport_flags,
                Some(&agent_data),
            )
            .await?;

        let finish = TeleportFinish {
            region_handle: destination.handle(),
            access: destination.access,
            endpoint: destination.endpoint,
            seed_capability: informed.seed_capability,
            location_id: TELEPORT_LOCATION_ID,
            teleport_flags,
            size_x: destination.size_x,
            size_y: destination.size_y,
            requesting_region,
        };
        self.collaborators
            .notifier()?
            .teleport_finish(agent_id, finish)
            .await
            .map_err(|e| HandoffError::Notify(e.to_string()))?;

        let outcome = agent
            .transfer()
            .wait_for_callback(self.settings.callback_timeout, CancelPolicy::Honor)
            .await;

        match outcome {
            WaitOutcome::Arrived => {
                self.complete_transfer(&agent, &destination, requesting_region).await;
                HandoffEventLogger::log_event(
                    agent_id,
                    HandoffEvent::TeleportFinished {
                        destination: destination.name.clone(),
                        reconciled: false,
                    },
                );
                Ok(TransferOutcome::Arrived)
            }
            WaitOutcome::Canceled => {
                HandoffEventLogger::log_event(
                    agent_id,
                    HandoffEvent::TeleportCanceled {
                        destination: destination.name.clone(),
                    },
                );
                Ok(TransferOutcome::Canceled)
            }
            WaitOutcome::TimedOut => {
                let present = match transport.retrieve_agent(&destination, agent_id).await {
                    Ok(data) => data.is_some(),
                    Err(e) => {
                        warn!(agent_id = %agent_id, region = %destination.name, error = %e, "Presence query failed");
                        false
                    }
                };
                if present {
                    info!(agent_id = %agent_id, region = %destination.name, "Callback missing but agent is at destination");
                    self.complete_transfer(&agent, &destination, requesting_region).await;
                    HandoffEventLogger::log_event(
                        agent_id,
                        HandoffEvent::TeleportFinished {
                            destination: destination.name.clone(),
                            reconciled: true,
                        },
                    );
                    return Ok(TransferOutcome::Reconciled);
                }

                warn!(agent_id = %agent_id, region = %destination.name, "Callback never came for teleporting agent; resetting");
                self.discard_orphan(&agent, &destination, requesting_region).await;
                Err(HandoffError::CallbackTimeout {
                    agent: agent_id,
                    region: destination.name,
                })
            }
        }
    }

    /// Make `destination` the root and drop children it cannot see.
    pub(crate) async fn complete_transfer(
        &self,
        agent: &AgentSessions,
        destination: &RegionDescriptor,
        source: RegionHandle,
    ) {
        agent.promote_root(destination.handle(), source).await;
        if let Err(e) = self.close_neighbor_agents(agent, destination).await {
            warn!(agent_id = %agent.agent_id(), error = %e, "Out-of-view cleanup skipped");
        }
    }

    /// The destination never took the agent. Close what was created there
    /// unless the client should keep it as a child of the source.
    async fn discard_orphan(
        &self,
        agent: &AgentSessions,
        destination: &RegionDescriptor,
        source: RegionHandle,
    ) {
        let (Ok(topology), Ok(transport)) = (self.collaborators.topology(), self.collaborators.transport())
        else {
            return;
        };
        if !topology.is_outside_view(source.grid(), destination.grid()) {
            return;
        }
        if let Err(e) = transport.close_agent(destination, agent.agent_id()).await {
            warn!(agent_id = %agent.agent_id(), region = %destination.name, error = %e, "Failed to close orphaned agent");
        }
        agent.remove_region(destination.handle()).await;
    }
}
