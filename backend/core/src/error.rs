use thiserror::Error;

use crate::types::AgentId;

/// Top-level error type for handoff operations.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("a transfer is already in progress for agent {0}")]
    TransferInProgress(AgentId),

    #[error("region not found: {0}")]
    RegionNotFound(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(&'static str),

    #[error("region {region} rejected agent: {reason}")]
    Rejected { region: String, reason: String },

    #[error("callback never came for agent {agent} at {region}")]
    CallbackTimeout { agent: AgentId, region: String },

    #[error("agent {agent} has no child session at {region}")]
    MissingChildSession { agent: AgentId, region: String },

    #[error("client notification failed: {0}")]
    Notify(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandoffError {
    /// Soft failures are expected under normal grid churn and logged below error level.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            HandoffError::TransferInProgress(_) | HandoffError::CallbackTimeout { .. }
        )
    }
}
