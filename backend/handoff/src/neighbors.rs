//! Child-agent enablement and neighbor informing.

use futures::future::join_all;
use tracing::{debug, info, warn};

use regionhop_core::{
    AgentData, AgentId, AgentUpdate, CircuitDescriptor, EnableSimulator,
    EstablishAgentCommunication, HandoffError, RegionDescriptor, RegionHandle, TeleportFlags,
};
use regionhop_logging::{HandoffEvent, HandoffEventLogger};
use regionhop_sessions::{caps, AgentSessions};

use crate::coordinator::HandoffCoordinator;

/// Per-region result of a best-effort fan-out.
#[derive(Debug)]
pub struct NeighborResult {
    pub region: String,
    pub handle: RegionHandle,
    pub result: Result<(), HandoffError>,
}

/// Collected results of a fan-out. One failure never stops the others.
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub results: Vec<NeighborResult>,
}

impl FanOutReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &NeighborResult> {
        self.results.iter().filter(|r| r.result.is_err())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// What informing one neighbor produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformedNeighbor {
    pub handle: RegionHandle,
    /// Seed capability the client knows this region by.
    pub seed_capability: String,
    /// The client was sent enable-simulator for this region.
    pub announced: bool,
}

impl HandoffCoordinator {
    /// Make sure every region within `draw_distance` of the requesting region
    /// holds a child agent the client knows about.
    pub async fn enable_child_agents(
        &self,
        agent_id: AgentId,
        requesting_region: RegionHandle,
        draw_distance: u32,
        circuit: &CircuitDescriptor,
    ) -> Result<FanOutReport, HandoffError> {
        let origin = self.region_by_handle(requesting_region).await.map_err(|e| {
            info!(agent_id = %agent_id, region = %requesting_region, "Cannot enable child agents: origin region unknown");
            e
        })?;
        let topology = self.collaborators.topology()?;
        let neighbors = topology.neighbors(&origin, draw_distance).await?;

        let attempts = neighbors
            .iter()
            .filter(|n| n.handle() != requesting_region)
            .map(|neighbor| async move {
                let result = self
                    .inform_client_of_neighbor(
                        agent_id,
                        requesting_region,
                        circuit.clone(),
                        neighbor,
                        TeleportFlags::DEFAULT,
                        None,
                    )
                    .await
                    .map(|_| ());
                NeighborResult {
                    region: neighbor.name.clone(),
                    handle: neighbor.handle(),
                    result,
                }
            });
        let report = FanOutReport {
            results: join_all(attempts).await,
        };

        for failed in report.failures() {
            if let Err(e) = &failed.result {
                warn!(agent_id = %agent_id, region = %failed.region, error = %e, "Failed to enable child agent");
            }
        }
        debug!(
            agent_id = %agent_id,
            origin = %origin.name,
            neighbors = report.len(),
            ok = report.all_succeeded(),
            "Child agents enabled"
        );
        Ok(report)
    }

    /// Materialize (or refresh) the agent at `neighbor` and tell the client a
    /// stable seed capability for it.
    ///
    /// `circuit` is this destination's private copy; it is stamped with a
    /// fresh capability path and the region's password before being sent.
    pub async fn inform_client_of_neighbor(
        &self,
        agent_id: AgentId,
        requesting_region: RegionHandle,
        mut circuit: CircuitDescriptor,
        neighbor: &RegionDescriptor,
        teleport_flags: TeleportFlags,
        agent_data: Option<&AgentData>,
    ) -> Result<InformedNeighbor, HandoffError> {
        let transport = self.collaborators.transport()?;
        let handle = neighbor.handle();
        info!(agent_id = %agent_id, region = %neighbor.name, "Informing client about neighbor");

        let agent = self.sessions.agent(agent_id).await;
        // Held until the seed is registered: a concurrent inform for the same
        // region waits here instead of reading an unfinished session.
        let creation = agent.lock_region(handle).await;
        let (session, new_child) = agent.region_or_create(handle).await;

        if !new_child && !session.disabled && !session.caps_seed_url.is_empty() {
            // Already live there: a refresh at most, never a second announcement.
            if let Some(data) = agent_data {
                let accepted = transport
                    .update_agent(neighbor, &AgentUpdate::Full(data.clone()))
                    .await
                    .map_err(|e| rejected(neighbor, e.to_string()))?;
                if !accepted {
                    return Err(rejected(neighbor, "agent update declined"));
                }
            }
            return Ok(InformedNeighbor {
                handle,
                seed_capability: session.caps_seed_url,
                announced: false,
            });
        }

        let caps_base = caps::random_object_path();
        let mut seed_capability = if new_child || session.caps_seed_url.is_empty() {
            caps::seed_url(&neighbor.server_uri, &caps_base)
        } else {
            session.caps_seed_url.clone()
        };

        circuit.caps_path = caps_base;
        circuit.set_caps_password(session.caps_password.clone());

        let response = match transport
            .create_agent(neighbor, &circuit, teleport_flags, agent_data)
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.forget_failed(&agent, handle, new_child, neighbor, e.to_string()).await),
        };
        if !response.accepted {
            let reason = response
                .error_detail
                .unwrap_or_else(|| "agent creation declined".to_string());
            return Err(self.forget_failed(&agent, handle, new_child, neighbor, reason).await);
        }
        if let Some(url) = response.capability_url.filter(|u| !u.is_empty()) {
            seed_capability = url;
        }
        agent.register_seed(handle, seed_capability.clone()).await;
        drop(creation);

        HandoffEventLogger::log_event(
            agent_id,
            HandoffEvent::NeighborInformed {
                region: neighbor.name.clone(),
                seed_capability: seed_capability.clone(),
                new_child,
            },
        );

        if new_child {
            self.announce_neighbor(agent_id, requesting_region, neighbor, &seed_capability)
                .await;
        }

        Ok(InformedNeighbor {
            handle,
            seed_capability,
            announced: new_child,
        })
    }

    /// Enable-simulator, then establish-agent-communication once the client
    /// has had time to open its circuit.
    async fn announce_neighbor(
        &self,
        agent_id: AgentId,
        requesting_region: RegionHandle,
        neighbor: &RegionDescriptor,
        seed_capability: &str,
    ) {
        let notifier = match self.collaborators.notifier() {
            Ok(notifier) => notifier,
            Err(e) => {
                warn!(agent_id = %agent_id, region = %neighbor.name, error = %e, "Cannot announce neighbor");
                return;
            }
        };

        if let Err(e) = notifier
            .enable_simulator(agent_id, EnableSimulator::for_region(neighbor, requesting_region))
            .await
        {
            warn!(agent_id = %agent_id, region = %neighbor.name, error = %e, "enable-simulator not delivered");
            return;
        }

        tokio::time::sleep(self.settings.establish_delay).await;

        let establish = EstablishAgentCommunication {
            region_handle: neighbor.handle(),
            endpoint: neighbor.endpoint,
            seed_capability: seed_capability.to_string(),
            size_x: neighbor.size_x,
            size_y: neighbor.size_y,
            requesting_region,
        };
        if let Err(e) = notifier.establish_agent_communication(agent_id, establish).await {
            warn!(agent_id = %agent_id, region = %neighbor.name, error = %e, "establish-agent-communication not delivered");
            return;
        }
        info!(agent_id = %agent_id, region = %neighbor.name, "Client informed about neighbor");
    }

    /// A session created for a rejected attempt is dropped so the next
    /// attempt starts over as a new child.
    async fn forget_failed(
        &self,
        agent: &AgentSessions,
        handle: RegionHandle,
        new_child: bool,
        neighbor: &RegionDescriptor,
        reason: String,
    ) -> HandoffError {
        if new_child {
            agent.remove_region(handle).await;
        }
        warn!(agent_id = %agent.agent_id(), region = %neighbor.name, reason = %reason, "Region refused agent");
        rejected(neighbor, reason)
    }

    /// Close child agents the agent can no longer see from `root`.
    /// Returns how many were closed.
    pub async fn close_neighbor_agents(
        &self,
        agent: &AgentSessions,
        root: &RegionDescriptor,
    ) -> Result<usize, HandoffError> {
        let topology = self.collaborators.topology()?;
        let transport = self.collaborators.transport()?;
        let root_handle = root.handle();
        let mut closed = 0;

        for session in agent.regions().await {
            let handle = session.region_handle;
            if handle == root_handle || !topology.is_outside_view(root.grid(), handle.grid()) {
                continue;
            }
            match self.region_by_handle(handle).await {
                Ok(region) => match transport.close_agent(&region, agent.agent_id()).await {
                    Ok(true) => {}
                    Ok(false) => debug!(agent_id = %agent.agent_id(), region = %region.name, "Region had no child agent to close"),
                    Err(e) => warn!(agent_id = %agent.agent_id(), region = %region.name, error = %e, "Failed to close child agent"),
                },
                Err(e) => debug!(agent_id = %agent.agent_id(), region = %handle, error = %e, "Closing child session of vanished region"),
            }
            agent.remove_region(handle).await;
            HandoffEventLogger::log_event(agent.agent_id(), HandoffEvent::NeighborClosed { region: handle });
            closed += 1;
        }
        Ok(closed)
    }
}

fn rejected(region: &RegionDescriptor, reason: impl Into<String>) -> HandoffError {
    HandoffError::Rejected {
        region: region.name.clone(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{circuit, region, Harness};
    use regionhop_core::{CreateAgentResponse, GridCoords, RegionHandle};
    use std::time::Duration;
    use uuid::Uuid;

    fn plus_layout() -> Vec<RegionDescriptor> {
        vec![
            region("home", 10, 10),
            region("east", 11, 10),
            region("north", 10, 11),
            region("west", 9, 10),
            region("faraway", 20, 20),
        ]
    }

    #[tokio::test]
    async fn enabling_informs_every_neighbor_but_the_origin() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        let home = harness.handle("home");

        let report = harness
            .coordinator
            .enable_child_agents(agent, home, 256, &circuit(agent))
            .await
            .unwrap();
        assert_eq!(report.len(), 3);
        assert!(report.all_succeeded());
        assert_eq!(harness.transport.create_count(), 3);

        let events = harness.events.drain(agent).await;
        let announced: Vec<_> = events
            .iter()
            .filter(|e| e.name() == "EnableSimulator")
            .map(|e| e.region_handle())
            .collect();
        assert_eq!(announced.len(), 3);
        assert!(!announced.contains(&home));
        assert_eq!(events.iter().filter(|e| e.name() == "EstablishAgentCommunication").count(), 3);
    }

    #[tokio::test]
    async fn unknown_origin_fails_fast() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        let nowhere = RegionHandle::from_grid(GridCoords::new(500, 500));
        let result = harness
            .coordinator
            .enable_child_agents(agent, nowhere, 256, &circuit(agent))
            .await;
        assert!(matches!(result, Err(HandoffError::RegionNotFound(_))));
        assert_eq!(harness.transport.create_count(), 0);
    }

    #[tokio::test]
    async fn one_rejection_does_not_stop_the_rest() {
        let harness = Harness::new(plus_layout());
        harness.transport.reject_create(harness.region("north").id);
        let agent = Uuid::new_v4();

        let report = harness
            .coordinator
            .enable_child_agents(agent, harness.handle("home"), 256, &circuit(agent))
            .await
            .unwrap();
        assert!(!report.all_succeeded());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failures().next().unwrap().region, "north");
        assert_eq!(harness.transport.create_count(), 3);

        // The refused region gets a clean slate next time.
        let sessions = harness.coordinator.sessions().agent(agent).await;
        assert!(sessions.region(harness.handle("north")).await.is_none());
        assert!(sessions.region(harness.handle("east")).await.is_some());
    }

    #[tokio::test]
    async fn each_neighbor_gets_its_own_caps_path_and_password() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        harness
            .coordinator
            .enable_child_agents(agent, harness.handle("home"), 256, &circuit(agent))
            .await
            .unwrap();

        let creates = harness.transport.creates();
        assert_eq!(creates.len(), 3);
        let mut paths: Vec<_> = creates.iter().map(|c| c.caps_path.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 3);
        assert!(creates.iter().all(|c| c.caps_password.is_some()));
        assert_ne!(creates[0].caps_password, creates[1].caps_password);
    }

    #[tokio::test]
    async fn informing_a_live_neighbor_twice_announces_once() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        let east = harness.region("east");
        let data = AgentData::new(agent);

        let first = harness
            .coordinator
            .inform_client_of_neighbor(agent, harness.handle("home"), circuit(agent), &east, TeleportFlags::DEFAULT, Some(&data))
            .await
            .unwrap();
        let second = harness
            .coordinator
            .inform_client_of_neighbor(agent, harness.handle("home"), circuit(agent), &east, TeleportFlags::DEFAULT, Some(&data))
            .await
            .unwrap();

        assert!(first.announced);
        assert!(!second.announced);
        assert_eq!(first.seed_capability, second.seed_capability);
        assert_eq!(harness.transport.create_count(), 1);
        assert_eq!(harness.transport.update_count(), 1);
        let enables = harness
            .events
            .drain(agent)
            .await
            .into_iter()
            .filter(|e| e.name() == "EnableSimulator")
            .count();
        assert_eq!(enables, 1);
    }

    #[tokio::test]
    async fn seed_survives_a_disabled_revisit() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        let east = harness.region("east");
        let home = harness.handle("home");

        let first = harness
            .coordinator
            .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, None)
            .await
            .unwrap();
        let sessions = harness.coordinator.sessions().agent(agent).await;
        sessions.set_disabled(east.handle(), true).await;

        let second = harness
            .coordinator
            .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, None)
            .await
            .unwrap();

        assert_eq!(harness.transport.create_count(), 2);
        assert!(!second.announced);
        assert_eq!(first.seed_capability, second.seed_capability);
        assert!(first.seed_capability.starts_with(&east.server_uri));
        assert!(first.seed_capability.contains("/CAPS/"));

        // The internal path is fresh on every attempt.
        let creates = harness.transport.creates();
        assert_ne!(creates[0].caps_path, creates[1].caps_path);
        assert!(!sessions.region(east.handle()).await.unwrap().disabled);
    }

    #[tokio::test]
    async fn overlapping_informs_share_one_seed() {
        let harness = Harness::new(plus_layout());
        harness.transport.slow_create(Duration::from_millis(50));
        let agent = Uuid::new_v4();
        let east = harness.region("east");
        let home = harness.handle("home");
        let data = AgentData::new(agent);

        let (first, second) = tokio::join!(
            harness
                .coordinator
                .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, None),
            harness
                .coordinator
                .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, Some(&data)),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(!first.seed_capability.is_empty());
        assert_eq!(first.seed_capability, second.seed_capability);
        assert!(first.announced);
        assert!(!second.announced);
        assert_eq!(harness.transport.create_count(), 1);
        // The refresh only went out once the agent existed there.
        assert_eq!(harness.transport.update_count(), 1);
    }

    #[tokio::test]
    async fn overlapping_inform_after_a_refusal_starts_over() {
        let harness = Harness::new(plus_layout());
        harness.transport.slow_create(Duration::from_millis(50));
        let east = harness.region("east");
        harness.transport.reject_create(east.id);
        let agent = Uuid::new_v4();
        let home = harness.handle("home");

        let (first, second) = tokio::join!(
            harness
                .coordinator
                .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, None),
            harness
                .coordinator
                .inform_client_of_neighbor(agent, home, circuit(agent), &east, TeleportFlags::DEFAULT, None),
        );

        assert!(matches!(first, Err(HandoffError::Rejected { .. })));
        assert!(matches!(second, Err(HandoffError::Rejected { .. })));
        assert_eq!(harness.transport.create_count(), 2);
        assert_eq!(harness.transport.update_count(), 0);
        let sessions = harness.coordinator.sessions().agent(agent).await;
        assert!(sessions.region(east.handle()).await.is_none());
    }

    #[tokio::test]
    async fn destination_supplied_capability_wins() {
        let harness = Harness::new(plus_layout());
        let east = harness.region("east");
        harness.transport.respond_with(
            east.id,
            CreateAgentResponse::accepted_with_capability("http://east.sim:9000/CAPS/canonical/"),
        );
        let agent = Uuid::new_v4();

        let informed = harness
            .coordinator
            .inform_client_of_neighbor(agent, harness.handle("home"), circuit(agent), &east, TeleportFlags::DEFAULT, None)
            .await
            .unwrap();
        assert_eq!(informed.seed_capability, "http://east.sim:9000/CAPS/canonical/");
        let stored = harness
            .coordinator
            .sessions()
            .agent(agent)
            .await
            .region(east.handle())
            .await
            .unwrap();
        assert_eq!(stored.caps_seed_url, informed.seed_capability);
    }

    #[tokio::test]
    async fn no_transport_means_no_informing() {
        let harness = Harness::without_transport(plus_layout());
        let agent = Uuid::new_v4();
        let east = harness.region("east");
        let err = harness
            .coordinator
            .inform_client_of_neighbor(agent, harness.handle("home"), circuit(agent), &east, TeleportFlags::DEFAULT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HandoffError::CollaboratorUnavailable("simulation transport")));
    }

    #[tokio::test]
    async fn closes_only_out_of_view_children() {
        let harness = Harness::new(plus_layout());
        let agent = Uuid::new_v4();
        let sessions = harness.coordinator.sessions().agent(agent).await;
        for name in ["east", "west", "faraway"] {
            sessions.region_or_create(harness.handle(name)).await;
        }

        let root = harness.region("east");
        let closed = harness
            .coordinator
            .close_neighbor_agents(&sessions, &root)
            .await
            .unwrap();

        // west is two regions from east; faraway is far from everything.
        assert_eq!(closed, 2);
        assert!(sessions.region(harness.handle("east")).await.is_some());
        assert!(sessions.region(harness.handle("west")).await.is_none());
        assert!(sessions.region(harness.handle("faraway")).await.is_none());
        assert_eq!(harness.transport.close_count(), 2);
    }
}
