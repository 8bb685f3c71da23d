//! Telemetry and structured logging components for regionhop.
//!
//! Handles log redaction of capability secrets, console + rolling NDJSON
//! output, and the handoff lifecycle event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{HandoffEvent, HandoffEventLogger, HandoffLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
