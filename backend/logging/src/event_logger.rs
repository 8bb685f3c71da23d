//! Handoff Event Logger
//!
//! Lifecycle events of agent transfers, emitted as structured `tracing`
//! records under the `handoff_events` target.

use chrono::{DateTime, Utc};
use regionhop_core::{AgentId, RegionHandle};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandoffEvent {
    NeighborInformed {
        region: String,
        seed_capability: String,
        new_child: bool,
    },
    NeighborClosed {
        region: RegionHandle,
    },
    TeleportStarted {
        destination: String,
    },
    TeleportFinished {
        destination: String,
        reconciled: bool,
    },
    TeleportCanceled {
        destination: String,
    },
    CrossingStarted {
        destination: String,
    },
    CrossingFinished {
        destination: String,
    },
    TransferFailed {
        destination: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct HandoffLogEntry {
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
    pub event: HandoffEvent,
}

pub struct HandoffEventLogger;

impl HandoffEventLogger {
    /// Build the log entry for an event, scrubbing capability secrets.
    pub fn entry(agent_id: AgentId, mut event: HandoffEvent) -> HandoffLogEntry {
        match &mut event {
            HandoffEvent::NeighborInformed { seed_capability, .. } => {
                *seed_capability = redact_sensitive_data(seed_capability);
            }
            HandoffEvent::TransferFailed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }

        HandoffLogEntry {
            agent_id,
            timestamp: Utc::now(),
            event,
        }
    }

    /// Logs a transfer lifecycle event.
    pub fn log_event(agent_id: AgentId, event: HandoffEvent) {
        let entry = Self::entry(agent_id, event);
        info!(target: "handoff_events", agent_id = %entry.agent_id, event = ?entry.event, "Handoff event");
    }
}
