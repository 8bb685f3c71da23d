//! Crossing: hand the root agent to an adjacent region during movement.
//!
//! The target already holds a child agent, so there is no informing step and
//! no presence fallback: a missed callback fails the attempt.

use tracing::{error, info, warn};

use regionhop_core::{
    AgentData, AgentId, AgentUpdate, CircuitDescriptor, CrossedRegion, HandoffError,
    PositionSnapshot, RegionHandle, RegionId, Vector3,
};
use regionhop_logging::{HandoffEvent, HandoffEventLogger};
use regionhop_sessions::{CancelPolicy, WaitOutcome};

use crate::coordinator::{HandoffCoordinator, TransferOutcome};

#[derive(Debug, Clone)]
pub struct CrossRequest {
    pub agent_id: AgentId,
    pub requesting_region: RegionHandle,
    pub destination: RegionId,
    /// Local to the requesting region.
    pub position: Vector3,
    pub velocity: Vector3,
    pub circuit: CircuitDescriptor,
    pub agent_data: AgentData,
}

impl HandoffCoordinator {
    pub async fn cross_agent(&self, request: CrossRequest) -> Result<TransferOutcome, HandoffError> {
        let agent_id = request.agent_id;
        let destination = request.destination;
        let result = self.run_crossing(request).await;
        if let Err(e) = &result {
            if !e.is_soft() {
                error!(agent_id = %agent_id, error = %e, "Crossing failed");
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

    async fn run_crossing(&self, request: CrossRequest) -> Result<TransferOutcome, HandoffError> {
        let CrossRequest {
            agent_id,
            requesting_region,
            destination,
            position,
            velocity,
            circuit,
            agent_data,
        } = request;

        let transport = self.collaborators.transport()?;
        let notifier = self.collaborators.notifier()?;
        let agent = self.sessions.agent(agent_id).await;
        let Some(_transit) = agent.transfer().try_begin() else {
            warn!(agent_id = %agent_id, "Crossing requested during another transfer");
            return Err(HandoffError::TransferInProgress(agent_id));
        };

        let destination = self.region_by_id(destination).await?;
        // Wait out any in-flight creation there so the seed read is settled.
        let settled = agent.lock_region(destination.handle()).await;
        let child = agent.region(destination.handle()).await;
        drop(settled);
        let child = child
            .filter(|c| !c.caps_seed_url.is_empty())
            .ok_or_else(|| HandoffError::MissingChildSession {
                agent: agent_id,
                region: destination.name.clone(),
            })?;
        HandoffEventLogger::log_event(
            agent_id,
            HandoffEvent::CrossingStarted {
                destination: destination.name.clone(),
            },
        );

        let accepted = transport
            .update_agent(&destination, &AgentUpdate::Full(agent_data))
            .await
            .unwrap_or_else(|e| {
                warn!(agent_id = %agent_id, region = %destination.name, error = %e, "Crossing update failed");
                false
            });
        if !accepted {
            warn!(agent_id = %agent_id, region = %destination.name, "Region did not accept crossing agent; resetting");
            return Err(HandoffError::Rejected {
                region: destination.name,
                reason: "agent update declined".to_string(),
            });
        }

        // The client expects coordinates local to the region it is entering.
        let local = PositionSnapshot::new(position, velocity)
            .rebased(requesting_region.grid(), destination.grid());
        let crossed = CrossedRegion {
            region_handle: destination.handle(),
            position: local.position,
            velocity: local.velocity,
            endpoint: destination.endpoint,
            seed_capability: child.caps_seed_url,
            session_id: circuit.session_id,
            size_x: destination.size_x,
            size_y: destination.size_y,
            requesting_region,
        };
        notifier
            .cross_region(agent_id, crossed)
            .await
            .map_err(|e| HandoffError::Notify(e.to_string()))?;

        match agent
            .transfer()
            .wait_for_callback(self.settings.callback_timeout, CancelPolicy::Ignore)
            .await
        {
            WaitOutcome::Arrived => {
                self.complete_transfer(&agent, &destination, requesting_region).await;
                info!(agent_id = %agent_id, region = %destination.name, "Crossing complete");
                HandoffEventLogger::log_event(
                    agent_id,
                    HandoffEvent::CrossingFinished {
                        destination: destination.name.clone(),
                    },
                );
                Ok(TransferOutcome::Arrived)
            }
            WaitOutcome::Canceled | WaitOutcome::TimedOut => {
                warn!(agent_id = %agent_id, region = %destination.name, "Callback never came for crossing agent; resetting");
                Err(HandoffError::CallbackTimeout {
                    agent: agent_id,
                    region: destination.name,
                })
            }
        }
    }
}
