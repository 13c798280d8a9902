//! Simulated clock for the test transports.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared simulated millisecond clock.
///
/// Every [`now`](SimClock::now) call advances time by one millisecond, so a
/// polling loop makes progress against retransmission deadlines without real
/// sleeps. The first reading is 1, never 0. Each transport instance receives
/// its clock explicitly; there is no process-wide clock state.
#[derive(Clone, Default)]
pub struct SimClock {
    millis: Arc<AtomicU32>,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one millisecond and return the new time.
    pub fn now(&self) -> u32 {
        self.millis.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Current time without advancing it.
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.millis.load(Ordering::Relaxed)
    }

    /// Jump forward, e.g. to force a retransmission timeout in a test.
    pub fn advance(&self, millis: u32) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }
}
