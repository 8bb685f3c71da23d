//! Session table.
//!
//! Owns every agent's transfer record and its per-region child sessions.
//! The coordinator only reaches this state through the accessors below.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use regionhop_core::{AgentId, RegionHandle};

use crate::caps;
use crate::transfer::TransferSession;

/// An agent's capability session at one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionChildSession {
    pub region_handle: RegionHandle,
    /// Seed URL advertised to the client; stable across repeat visits.
    pub caps_seed_url: String,
    pub caps_password: String,
    pub disabled: bool,
    pub is_root_agent: bool,
}

impl RegionChildSession {
    fn new(region_handle: RegionHandle) -> Self {
        Self {
            region_handle,
            caps_seed_url: String::new(),
            caps_password: caps::random_password(),
            disabled: false,
            is_root_agent: false,
        }
    }
}

/// All session state for one agent.
#[derive(Debug)]
pub struct AgentSessions {
    agent_id: AgentId,
    transfer: TransferSession,
    regions: RwLock<HashMap<RegionHandle, RegionChildSession>>,
    /// Per-region gates serializing child creation.
    creating: Mutex<HashMap<RegionHandle, Arc<Mutex<()>>>>,
}

impl AgentSessions {
    fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            transfer: TransferSession::new(),
            regions: RwLock::new(HashMap::new()),
            creating: Mutex::new(HashMap::new()),
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn transfer(&self) -> &TransferSession {
        &self.transfer
    }

    pub async fn region(&self, handle: RegionHandle) -> Option<RegionChildSession> {
        self.regions.read().await.get(&handle).cloned()
    }

    /// Serialize child creation at `handle`.
    ///
    /// While the guard is held no other holder can observe the session at
    /// `handle` half-built: once acquired, the session is either absent,
    /// registered with a seed, or disabled.
    pub async fn lock_region(&self, handle: RegionHandle) -> OwnedMutexGuard<()> {
        let gate = self.creating.lock().await.entry(handle).or_default().clone();
        gate.lock_owned().await
    }

    /// Fetch the child session at `handle`, creating it if this is the first visit.
    /// The flag is `true` when the session was created by this call.
    pub async fn region_or_create(&self, handle: RegionHandle) -> (RegionChildSession, bool) {
        let mut regions = self.regions.write().await;
        if let Some(existing) = regions.get(&handle) {
            return (existing.clone(), false);
        }
        let session = RegionChildSession::new(handle);
        regions.insert(handle, session.clone());
        debug!(agent_id = %self.agent_id, region = %handle, "Created region child session");
        (session, true)
    }

    /// Register the seed URL for a region and mark its session live again.
    pub async fn register_seed(&self, handle: RegionHandle, seed_url: impl Into<String>) -> bool {
        let mut regions = self.regions.write().await;
        match regions.get_mut(&handle) {
            Some(session) => {
                session.caps_seed_url = seed_url.into();
                session.disabled = false;
                true
            }
            None => false,
        }
    }

    /// Set the disabled flag; returns the previous value, or `None` if absent.
    pub async fn set_disabled(&self, handle: RegionHandle, disabled: bool) -> Option<bool> {
        let mut regions = self.regions.write().await;
        regions.get_mut(&handle).map(|session| {
            let previous = session.disabled;
            session.disabled = disabled;
            previous
        })
    }

    pub async fn remove_region(&self, handle: RegionHandle) -> Option<RegionChildSession> {
        let removed = self.regions.write().await.remove(&handle);
        let mut creating = self.creating.lock().await;
        if creating.get(&handle).is_some_and(|gate| Arc::strong_count(gate) == 1) {
            creating.remove(&handle);
        }
        drop(creating);
        if removed.is_some() {
            debug!(agent_id = %self.agent_id, region = %handle, "Removed region child session");
        }
        removed
    }

    /// Make `new_root` authoritative and demote `old_root`, under one lock.
    pub async fn promote_root(&self, new_root: RegionHandle, old_root: RegionHandle) {
        let mut regions = self.regions.write().await;
        if let Some(old) = regions.get_mut(&old_root) {
            old.is_root_agent = false;
        }
        if let Some(new) = regions.get_mut(&new_root) {
            new.is_root_agent = true;
        }
        info!(agent_id = %self.agent_id, root = %new_root, previous = %old_root, "Root agent moved");
    }

    /// The region currently holding the root agent, if any.
    pub async fn root_region(&self) -> Option<RegionHandle> {
        self.regions
            .read()
            .await
            .values()
            .find(|s| s.is_root_agent)
            .map(|s| s.region_handle)
    }

    pub async fn regions(&self) -> Vec<RegionChildSession> {
        self.regions.read().await.values().cloned().collect()
    }
}

/// Table of all agents known to this coordinator.
#[derive(Debug, Default, Clone)]
pub struct SessionTable {
    agents: Arc<RwLock<HashMap<AgentId, Arc<AgentSessions>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the agent's sessions, creating an empty record on first contact.
    pub async fn agent(&self, agent_id: AgentId) -> Arc<AgentSessions> {
        if let Some(existing) = self.agents.read().await.get(&agent_id) {
            return existing.clone();
        }
        let mut agents = self.agents.write().await;
        agents
            .entry(agent_id)
            .or_insert_with(|| Arc::new(AgentSessions::new(agent_id)))
            .clone()
    }

    pub async fn get(&self, agent_id: AgentId) -> Option<Arc<AgentSessions>> {
        self.agents.read().await.get(&agent_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
