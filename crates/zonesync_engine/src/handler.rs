//! Executes single operations against the remote backend.

use crate::backend::{ProbeResult, RemoteBackend};
use crate::config::SyncConfig;
use crate::gate::ConcurrencyGate;
use crate::throttle::AdaptiveThrottle;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use zonesync_protocol::{Operation, OperationResponse, RemoteError, SavePolicy, ZoneId};

/// Executes exactly one operation per call: wait for the throttle deadline,
/// acquire an admission permit, perform the remote call, release, then
/// adjust the throttle from the result.
pub struct OperationHandler<B> {
    backend: Arc<B>,
    gate: ConcurrencyGate,
    throttle: Mutex<AdaptiveThrottle>,
    zone: ZoneId,
    save_policy: SavePolicy,
}

impl<B: RemoteBackend> OperationHandler<B> {
    /// Creates a handler owning the gate and throttle for this backend.
    pub fn new(backend: Arc<B>, config: &SyncConfig) -> Self {
        Self {
            backend,
            gate: ConcurrencyGate::new(config.max_concurrent_requests),
            throttle: Mutex::new(AdaptiveThrottle::new(
                config.min_throttle_delay,
                config.max_throttle_delay,
            )),
            zone: config.zone.clone(),
            save_policy: config.save_policy,
        }
    }

    /// The delay the throttle currently enforces.
    pub fn current_delay(&self) -> std::time::Duration {
        self.throttle.lock().current_delay()
    }

    /// Executes one operation and returns its response or error.
    pub async fn execute(&self, operation: Operation) -> Result<OperationResponse, RemoteError> {
        self.wait_for_throttle().await;

        let permit = self.gate.acquire().await;
        let result = self.perform(operation).await;
        drop(permit);

        let mut throttle = self.throttle.lock();
        match &result {
            Ok(_) => throttle.record_success(),
            Err(error) => throttle.record_failure(error.retry_after()),
        }
        result
    }

    /// Sleeps until the throttle's next-allowed deadline has passed.
    /// Failures elsewhere may push the deadline while we sleep, so check
    /// again after waking.
    async fn wait_for_throttle(&self) {
        loop {
            let deadline = self.throttle.lock().ready_at();
            match deadline {
                Some(at) if at > tokio::time::Instant::now() => {
                    debug!(?at, "throttled, waiting");
                    tokio::time::sleep_until(at).await;
                }
                _ => return,
            }
        }
    }

    async fn perform(&self, operation: Operation) -> Result<OperationResponse, RemoteError> {
        match operation {
            Operation::CreateZone(zone) => {
                // Idempotent short-circuit: a prior run may have created
                // the zone already.
                if self.backend.probe_zone(&zone).await? == ProbeResult::Exists {
                    return Ok(OperationResponse::ZoneCreated {
                        already_existed: true,
                    });
                }
                self.backend.create_zone(&zone).await?;
                Ok(OperationResponse::ZoneCreated {
                    already_existed: false,
                })
            }
            Operation::Subscribe { zone, subscription } => {
                if self.backend.probe_subscription(&zone, &subscription).await?
                    == ProbeResult::Exists
                {
                    return Ok(OperationResponse::Subscribed {
                        already_existed: true,
                    });
                }
                self.backend.create_subscription(&zone, &subscription).await?;
                Ok(OperationResponse::Subscribed {
                    already_existed: false,
                })
            }
            Operation::Send {
                modifications,
                deletions,
            } => {
                let outcome = self
                    .backend
                    .modify_records(&self.zone, modifications, deletions, self.save_policy)
                    .await?;
                Ok(OperationResponse::SendDone(outcome))
            }
            Operation::Fetch { cursor } => {
                let outcome = self
                    .backend
                    .fetch_changes(&self.zone, cursor.as_ref())
                    .await?;
                Ok(OperationResponse::FetchDone(outcome))
            }
        }
    }
}
