//! Configuration for the sync engine.

use std::time::Duration;
use zonesync_protocol::{SavePolicy, SubscriptionId, ZoneId};

/// Configuration for a sync engine instance.
///
/// One engine serves one container, one zone, and one change subscription.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Container identity on the remote store.
    pub container: String,
    /// Zone holding this engine's records.
    pub zone: ZoneId,
    /// Change subscription identity for the zone.
    pub subscription: SubscriptionId,
    /// Retries allowed for one operation before the engine stops.
    pub max_retry_attempts: u32,
    /// Maximum records (modifications + deletions) per send operation.
    pub max_records_per_operation: usize,
    /// Floor for the adaptive inter-request delay.
    pub min_throttle_delay: Duration,
    /// Ceiling for the adaptive inter-request delay.
    pub max_throttle_delay: Duration,
    /// Write-conflict policy passed to the backend on every save.
    pub save_policy: SavePolicy,
    /// Query the account status when the engine starts.
    pub check_account_status_on_start: bool,
    /// Remote calls allowed in flight at once.
    pub max_concurrent_requests: usize,
}

impl SyncConfig {
    /// Creates a configuration with default tuning.
    pub fn new(
        container: impl Into<String>,
        zone: ZoneId,
        subscription: SubscriptionId,
    ) -> Self {
        Self {
            container: container.into(),
            zone,
            subscription,
            max_retry_attempts: 5,
            max_records_per_operation: 400,
            min_throttle_delay: Duration::from_secs(1),
            max_throttle_delay: Duration::from_secs(64),
            save_policy: SavePolicy::default(),
            check_account_status_on_start: true,
            max_concurrent_requests: 1,
        }
    }

    /// Sets the retry ceiling.
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Sets the per-operation record limit.
    pub fn with_max_records_per_operation(mut self, max: usize) -> Self {
        self.max_records_per_operation = max;
        self
    }

    /// Sets the throttle delay bounds.
    pub fn with_throttle_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_throttle_delay = min;
        self.max_throttle_delay = max;
        self
    }

    /// Sets the write-conflict policy.
    pub fn with_save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = policy;
        self
    }

    /// Enables or disables the account status query on start.
    pub fn with_account_status_check(mut self, check: bool) -> Self {
        self.check_account_status_on_start = check;
        self
    }

    /// Sets how many remote calls may be in flight at once.
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(
            "container",
            ZoneId::new("zone"),
            SubscriptionId::new("zone-changes"),
        )
    }
}
