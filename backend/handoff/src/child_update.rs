//! Position fan-out to an agent's child agents.

use futures::future::join_all;
use tracing::{debug, info};

use regionhop_core::{AgentPosition, AgentUpdate, HandoffError, RegionId};

use crate::coordinator::HandoffCoordinator;
use crate::neighbors::{FanOutReport, NeighborResult};

impl HandoffCoordinator {
    /// Push `position` to every neighbor of the region that owns the agent.
    /// A failing neighbor is logged and skipped.
    pub async fn send_child_agent_update(
        &self,
        position: &AgentPosition,
        region_id: RegionId,
    ) -> Result<FanOutReport, HandoffError> {
        let origin = self.region_by_id(region_id).await.map_err(|e| {
            info!(agent_id = %position.agent_id, region_id = %region_id, "Cannot update child agents: owning region unknown");
            e
        })?;
        let topology = self.collaborators.topology()?;
        let transport = self.collaborators.transport()?;

        let radius = if position.draw_distance > 0.0 {
            position.draw_distance as u32
        } else {
            self.settings.default_draw_distance
        };
        let neighbors = topology.neighbors(&origin, radius).await?;

        let update = AgentUpdate::Position(position.clone());
        let pushes = neighbors
            .iter()
            .filter(|n| n.id != origin.id)
            .map(|neighbor| {
                let update = &update;
                async move {
                    let result = match transport.update_agent(neighbor, update).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(HandoffError::Rejected {
                            region: neighbor.name.clone(),
                            reason: "position update declined".to_string(),
                        }),
                        Err(e) => Err(HandoffError::Rejected {
                            region: neighbor.name.clone(),
                            reason: e.to_string(),
                        }),
                    };
                    if let Err(e) = &result {
                        info!(agent_id = %position.agent_id, region = %neighbor.name, error = %e, "Failed to update child agent");
                    }
                    NeighborResult {
                        region: neighbor.name.clone(),
                        handle: neighbor.handle(),
                        result,
                    }
                }
            });
        let report = FanOutReport {
            results: join_all(pushes).await,
        };
        debug!(
            agent_id = %position.agent_id,
            origin = %origin.name,
            neighbors = report.len(),
            ok = report.all_succeeded(),
            "Child agent positions pushed"
        );
        Ok(report)
    }
}
