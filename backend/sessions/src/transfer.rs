//! Per-agent transfer state.
//!
//! Holds the three protocol flags that serialize handoffs for one agent and
//! wakes whoever is waiting on them. The in-transit flag is only ever taken
//! through a compare-and-set, so two concurrent requests cannot both pass the
//! single-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Snapshot of an agent's transfer flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransferFlags {
    pub in_transit: bool,
    pub cancel_requested: bool,
    pub callback_received: bool,
}

/// How a bounded wait for the destination's arrival callback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Arrived,
    Canceled,
    TimedOut,
}

/// Whether a wait should return early when the client asks to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPolicy {
    Honor,
    Ignore,
}

#[derive(Debug, Default)]
pub struct TransferSession {
    in_transit: AtomicBool,
    cancel_requested: AtomicBool,
    callback_received: AtomicBool,
    wake: Notify,
}

impl TransferSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark the agent in transit.
    ///
    /// Returns `None` if another transfer already holds the flag. The returned
    /// guard clears every flag when dropped.
    pub fn try_begin(&self) -> Option<TransitGuard<'_>> {
        if self
            .in_transit
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.cancel_requested.store(false, Ordering::Release);
        self.callback_received.store(false, Ordering::Release);
        Some(TransitGuard { session: self })
    }

    /// Record the destination's arrival callback and wake the waiter.
    pub fn mark_arrived(&self) {
        self.callback_received.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Record a client cancel request and wake the waiter.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    pub fn is_in_transit(&self) -> bool {
        self.in_transit.load(Ordering::Acquire)
    }

    pub fn flags(&self) -> TransferFlags {
        TransferFlags {
            in_transit: self.in_transit.load(Ordering::Acquire),
            cancel_requested: self.cancel_requested.load(Ordering::Acquire),
            callback_received: self.callback_received.load(Ordering::Acquire),
        }
    }

    /// Wait until the arrival callback comes, the client cancels (if honored),
    /// or `timeout` elapses. Never sleeps past the deadline.
    pub async fn wait_for_callback(&self, timeout: Duration, cancel: CancelPolicy) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            // Register before checking the flags so a wake-up between the
            // check and the await is not lost.
            notified.as_mut().enable();

            if self.callback_received.load(Ordering::Acquire) {
                return WaitOutcome::Arrived;
            }
            if cancel == CancelPolicy::Honor && self.cancel_requested.load(Ordering::Acquire) {
                return WaitOutcome::Canceled;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                if self.callback_received.load(Ordering::Acquire) {
                    return WaitOutcome::Arrived;
                }
                debug!(timeout_ms = timeout.as_millis() as u64, "Callback wait expired");
                return WaitOutcome::TimedOut;
            }
        }
    }

    fn reset(&self) {
        self.cancel_requested.store(false, Ordering::Release);
        self.callback_received.store(false, Ordering::Release);
        self.in_transit.store(false, Ordering::Release);
    }
}

/// Held for the duration of one transfer attempt; resets all flags on drop.
#[derive(Debug)]
pub struct TransitGuard<'a> {
    session: &'a TransferSession,
}

impl Drop for TransitGuard<'_> {
    fn drop(&mut self) {
        self.session.reset();
    }
}
