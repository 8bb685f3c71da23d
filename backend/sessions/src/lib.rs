//! `regionhop-sessions`: per-agent session state for the handoff coordinator.
//!
//! Provides:
//! - `SessionTable`: agent → sessions map, created lazily on first contact
//! - `TransferSession`: atomic single-flight flags and the bounded callback wait
//! - `RegionChildSession`: capability seed, password and root/child status per region
//! - Capability path generation

pub mod caps;
pub mod table;
pub mod transfer;

pub use table::{AgentSessions, RegionChildSession, SessionTable};
pub use transfer::{CancelPolicy, TransferFlags, TransferSession, TransitGuard, WaitOutcome};
