//! Per-agent client event queue.
//!
//! Implements `ClientNotifier` by buffering typed `ClientEvent`s per agent.

pub mod queue;

pub use queue::{EventQueue, EventReceiver, EventSender};
