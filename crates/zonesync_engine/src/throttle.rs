//! Adaptive inter-request delay.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive remote calls that grows on
/// failure and shrinks on success.
///
/// The delay is bounded in `[min_delay, max_delay]`. A failure doubles it
/// unless the server supplied its own retry delay; a success halves it.
/// Every adjustment restamps the next-allowed deadline.
#[derive(Debug)]
pub struct AdaptiveThrottle {
    current_delay: Duration,
    min_delay: Duration,
    max_delay: Duration,
    ready_at: Option<Instant>,
}

impl AdaptiveThrottle {
    /// Creates a throttle starting at the minimum delay.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            current_delay: min_delay,
            min_delay,
            max_delay,
            ready_at: None,
        }
    }

    /// The delay currently enforced between calls.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Deadline before which no call should be issued, if one is pending.
    pub fn ready_at(&self) -> Option<Instant> {
        self.ready_at
    }

    /// Shrinks the delay after a successful call.
    pub fn record_success(&mut self) {
        self.current_delay = (self.current_delay / 2).max(self.min_delay);
        self.ready_at = Some(Instant::now() + self.current_delay);
    }

    /// Grows the delay after a failed call, preferring the server's own
    /// suggestion when one was provided.
    pub fn record_failure(&mut self, server_delay: Option<Duration>) {
        self.current_delay = match server_delay {
            Some(delay) => delay.clamp(self.min_delay, self.max_delay),
            None => (self.current_delay * 2).min(self.max_delay),
        };
        self.ready_at = Some(Instant::now() + self.current_delay);
    }
}
