//! Engine lifecycle events.

use zonesync_protocol::{AccountStatus, Operation, OperationResponse, RemoteError};

/// Everything that can happen to the engine.
///
/// External calls and internal feedback alike are expressed as events so
/// the reducer sees one total order of mutations.
#[derive(Debug, Clone)]
pub enum Event {
    /// Begin processing queues.
    Start,
    /// Stop processing; carries the fatal error when stopping abnormally.
    Stop(Option<RemoteError>),
    /// The account status was (re)determined.
    AccountStatusChanged(AccountStatus),
    /// An operation joined the tail of its queue.
    OperationEnqueued(Operation),
    /// The current operation finished successfully.
    OperationSucceeded(OperationResponse),
    /// The current operation failed; awaiting classification.
    OperationFailed(RemoteError),
    /// The current operation will be retried in place.
    OperationRetry(RemoteError),
    /// The current operation was superseded by the given operations,
    /// front-inserted in order.
    OperationReplaced(Vec<Operation>),
}

impl Event {
    /// True for events that report the outcome of an in-flight operation.
    /// Outcome events are discarded when the engine stopped meanwhile.
    pub fn is_operation_outcome(&self) -> bool {
        matches!(
            self,
            Event::OperationSucceeded(_) | Event::OperationFailed(_) | Event::OperationRetry(_)
        )
    }
}
