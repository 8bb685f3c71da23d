//! Agent handoff coordinator.
//!
//! Owns the session table and the four grid collaborators. The flows built on
//! top of it live in `neighbors`, `teleport`, `crossing` and `child_update`.

use std::sync::Arc;
use std::time::Duration;

use regionhop_config::HandoffSettings;
use regionhop_core::{
    ClientNotifier, HandoffError, NeighborTopology, RegionDescriptor, RegionDirectory,
    RegionHandle, RegionId, SimulationTransport,
};
use regionhop_sessions::SessionTable;
use tracing::{debug, warn};

/// Result of a teleport or crossing that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination confirmed arrival through its callback.
    Arrived,
    /// No callback, but a presence query found the agent at the destination.
    Reconciled,
    /// The client canceled while the coordinator was waiting.
    Canceled,
}

impl TransferOutcome {
    /// Whether the agent now lives at the destination.
    pub fn is_success(self) -> bool {
        matches!(self, TransferOutcome::Arrived | TransferOutcome::Reconciled)
    }
}

/// Timing knobs for the handoff flows.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub callback_timeout: Duration,
    pub establish_delay: Duration,
    pub default_draw_distance: u32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&HandoffSettings::default())
    }
}

impl From<&HandoffSettings> for CoordinatorSettings {
    fn from(settings: &HandoffSettings) -> Self {
        Self {
            callback_timeout: settings.callback_timeout(),
            establish_delay: settings.establish_delay(),
            default_draw_distance: settings.default_draw_distance(),
        }
    }
}

/// The grid services the coordinator talks to. Any of them may be missing,
/// in which case operations that need it fail with `CollaboratorUnavailable`.
#[derive(Clone, Default)]
pub struct Collaborators {
    directory: Option<Arc<dyn RegionDirectory>>,
    topology: Option<Arc<dyn NeighborTopology>>,
    transport: Option<Arc<dyn SimulationTransport>>,
    notifier: Option<Arc<dyn ClientNotifier>>,
}

impl Collaborators {
    pub fn directory(&self) -> Result<&Arc<dyn RegionDirectory>, HandoffError> {
        self.directory
            .as_ref()
            .ok_or(HandoffError::CollaboratorUnavailable("region directory"))
    }

    pub fn topology(&self) -> Result<&Arc<dyn NeighborTopology>, HandoffError> {
        self.topology
            .as_ref()
            .ok_or(HandoffError::CollaboratorUnavailable("neighbor topology"))
    }

    pub fn transport(&self) -> Result<&Arc<dyn SimulationTransport>, HandoffError> {
        self.transport
            .as_ref()
            .ok_or(HandoffError::CollaboratorUnavailable("simulation transport"))
    }

    pub fn notifier(&self) -> Result<&Arc<dyn ClientNotifier>, HandoffError> {
        self.notifier
            .as_ref()
            .ok_or(HandoffError::CollaboratorUnavailable("client notifier"))
    }
}

/// Builder for [`HandoffCoordinator`].
#[derive(Default)]
pub struct CoordinatorBuilder {
    sessions: Option<SessionTable>,
    collaborators: Collaborators,
    settings: CoordinatorSettings,
}

impl CoordinatorBuilder {
    pub fn directory(mut self, directory: Arc<dyn RegionDirectory>) -> Self {
        self.collaborators.directory = Some(directory);
        self
    }

    pub fn topology(mut self, topology: Arc<dyn NeighborTopology>) -> Self {
        self.collaborators.topology = Some(topology);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn SimulationTransport>) -> Self {
        self.collaborators.transport = Some(transport);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ClientNotifier>) -> Self {
        self.collaborators.notifier = Some(notifier);
        self
    }

    /// Share an existing session table instead of starting empty.
    pub fn sessions(mut self, sessions: SessionTable) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> HandoffCoordinator {
        HandoffCoordinator {
            sessions: self.sessions.unwrap_or_default(),
            collaborators: self.collaborators,
            settings: self.settings,
        }
    }
}

/// Drives child-agent enablement, teleports and crossings for every agent.
///
/// Cheap to clone; clones share the same session table.
#[derive(Clone)]
pub struct HandoffCoordinator {
    pub(crate) sessions: SessionTable,
    pub(crate) collaborators: Collaborators,
    pub(crate) settings: CoordinatorSettings,
}

impl HandoffCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Resolve the region whose origin is encoded in `handle`.
    pub(crate) async fn region_by_handle(
        &self,
        handle: RegionHandle,
    ) -> Result<RegionDescriptor, HandoffError> {
        let directory = self.collaborators.directory()?;
        let (x, y) = handle.world();
        match directory.region_by_position(x, y).await? {
            Some(region) => Ok(region),
            None => {
                debug!(region = %handle, "No region at handle");
                Err(HandoffError::RegionNotFound(handle.to_string()))
            }
        }
    }

    /// Fetch a fresh descriptor by id. Descriptors supplied by peers are never used.
    pub(crate) async fn region_by_id(&self, id: RegionId) -> Result<RegionDescriptor, HandoffError> {
        let directory = self.collaborators.directory()?;
        match directory.region_by_id(id).await? {
            Some(region) => Ok(region),
            None => {
                warn!(region_id = %id, "Destination region is not in the directory");
                Err(HandoffError::RegionNotFound(id.to_string()))
            }
        }
    }
}
