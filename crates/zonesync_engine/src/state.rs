//! Pure event/state reducer.

use crate::event::Event;
use std::collections::VecDeque;
use std::time::Instant;
use zonesync_protocol::{
    AccountStatus, Operation, OperationResponse, QueueKind, RemoteError,
};

/// One queued operation plus the identity distinguishing it from
/// value-identical entries elsewhere in the queues.
#[derive(Debug, Clone, PartialEq)]
struct QueueEntry {
    id: u64,
    operation: Operation,
}

/// The engine's entire mutable state: four priority-ordered operation
/// queues plus the flags that gate them.
///
/// `apply` is a pure transition function; it never performs I/O and never
/// blocks. The current queue and current operation are derived from the
/// queues and flags on every read, never stored.
#[derive(Debug, Default)]
pub struct SyncState {
    create_zone: VecDeque<QueueEntry>,
    subscribe: VecDeque<QueueEntry>,
    send: VecDeque<QueueEntry>,
    fetch: VecDeque<QueueEntry>,
    next_entry_id: u64,

    is_running: bool,
    account_status: Option<AccountStatus>,
    is_zone_available: bool,
    is_subscribed: bool,
    retry_count: u32,
    retry_reason: Option<RemoteError>,
    last_fetched_at: Option<Instant>,
    last_sent_at: Option<Instant>,
}

impl SyncState {
    /// Creates a pristine state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the engine is processing queues.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Last known account status, if any was reported.
    pub fn account_status(&self) -> Option<AccountStatus> {
        self.account_status
    }

    /// True once the zone is known to exist.
    pub fn is_zone_available(&self) -> bool {
        self.is_zone_available
    }

    /// True once the change subscription is known to exist.
    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }

    /// Retries recorded for the current operation.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Error that caused the most recent retry.
    pub fn retry_reason(&self) -> Option<&RemoteError> {
        self.retry_reason.as_ref()
    }

    /// When the last complete fetch finished.
    pub fn last_fetched_at(&self) -> Option<Instant> {
        self.last_fetched_at
    }

    /// When the last send finished.
    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    fn queue(&self, kind: QueueKind) -> &VecDeque<QueueEntry> {
        match kind {
            QueueKind::CreateZone => &self.create_zone,
            QueueKind::Subscribe => &self.subscribe,
            QueueKind::Send => &self.send,
            QueueKind::Fetch => &self.fetch,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut VecDeque<QueueEntry> {
        match kind {
            QueueKind::CreateZone => &mut self.create_zone,
            QueueKind::Subscribe => &mut self.subscribe,
            QueueKind::Send => &mut self.send,
            QueueKind::Fetch => &mut self.fetch,
        }
    }

    /// Length of one queue.
    pub fn queue_len(&self, kind: QueueKind) -> usize {
        self.queue(kind).len()
    }

    /// Sum of all four queue lengths.
    pub fn pending_operations(&self) -> usize {
        QueueKind::ALL.iter().map(|k| self.queue(*k).len()).sum()
    }

    /// A queue is enabled only while the engine runs with an available
    /// account; Send and Fetch additionally require the zone and the
    /// subscription to exist.
    fn is_enabled(&self, kind: QueueKind) -> bool {
        let account_ok = self
            .account_status
            .map(|s| s.is_available())
            .unwrap_or(false);
        if !self.is_running || !account_ok {
            return false;
        }
        match kind {
            QueueKind::CreateZone | QueueKind::Subscribe => true,
            QueueKind::Send | QueueKind::Fetch => self.is_zone_available && self.is_subscribed,
        }
    }

    /// The highest-priority enabled, non-empty queue.
    pub fn current_queue(&self) -> Option<QueueKind> {
        QueueKind::ALL
            .into_iter()
            .find(|kind| self.is_enabled(*kind) && !self.queue(*kind).is_empty())
    }

    /// Head of the current queue.
    pub fn current_operation(&self) -> Option<&Operation> {
        self.current_queue()
            .and_then(|kind| self.queue(kind).front())
            .map(|entry| &entry.operation)
    }

    /// Identity of the current head entry. Distinct for every queued
    /// entry, including value-identical duplicates, so callers can tell
    /// "same head" from "new head carrying the same payload".
    pub fn current_operation_id(&self) -> Option<u64> {
        self.current_queue()
            .and_then(|kind| self.queue(kind).front())
            .map(|entry| entry.id)
    }

    /// Applies one event, producing the next state in place.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Start => {
                self.is_running = true;
            }
            Event::Stop(_) => {
                self.is_running = false;
            }
            Event::AccountStatusChanged(status) => {
                self.account_status = Some(*status);
            }
            Event::OperationEnqueued(op) => {
                self.push_back(op.clone());
            }
            Event::OperationSucceeded(response) => {
                self.reset_retries();
                self.dequeue_current();
                self.absorb_response(response);
            }
            Event::OperationFailed(_) => {
                // The orchestrator classifies failures into other events.
            }
            Event::OperationRetry(error) => {
                self.retry_count += 1;
                self.retry_reason = Some(error.clone());
            }
            Event::OperationReplaced(operations) => {
                self.reset_retries();
                self.dequeue_current();
                for op in operations {
                    self.push_front(op.clone());
                }
            }
        }
    }

    /// Clears every queue and flag back to its pristine value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn reset_retries(&mut self) {
        self.retry_count = 0;
        self.retry_reason = None;
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    fn push_back(&mut self, operation: Operation) {
        let kind = operation.kind();
        let entry = QueueEntry {
            id: self.fresh_id(),
            operation,
        };
        self.queue_mut(kind).push_back(entry);
    }

    fn push_front(&mut self, operation: Operation) {
        let kind = operation.kind();
        let entry = QueueEntry {
            id: self.fresh_id(),
            operation,
        };
        self.queue_mut(kind).push_front(entry);
    }

    /// Pops the head of whichever queue is current right now.
    fn dequeue_current(&mut self) {
        if let Some(kind) = self.current_queue() {
            self.queue_mut(kind).pop_front();
        }
    }

    fn absorb_response(&mut self, response: &OperationResponse) {
        match response {
            OperationResponse::ZoneCreated { .. } => {
                self.is_zone_available = true;
            }
            OperationResponse::Subscribed { .. } => {
                self.is_subscribed = true;
            }
            OperationResponse::SendDone(_) => {
                self.last_sent_at = Some(Instant::now());
            }
            OperationResponse::FetchDone(outcome) => {
                if outcome.more_pending {
                    // Pagination continuation: the follow-up fetch jumps
                    // ahead of anything already queued.
                    self.push_front(Operation::Fetch {
                        cursor: outcome.new_cursor.clone(),
                    });
                } else {
                    self.last_fetched_at = Some(Instant::now());
                }
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use zonesync_protocol::{Record, SendOutcome, SubscriptionId, ZoneId};

    fn arb_operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            Just(Operation::CreateZone(ZoneId::new("zone"))),
            Just(Operation::Subscribe {
                zone: ZoneId::new("zone"),
                subscription: SubscriptionId::new("sub"),
            }),
            (1usize..4).prop_map(|n| Operation::Send {
                modifications: (0..n).map(|i| Record::new(format!("r{i}"), "T")).collect(),
                deletions: vec![],
            }),
            Just(Operation::Fetch { cursor: None }),
        ]
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            Just(Event::Start),
            Just(Event::Stop(None)),
            Just(Event::AccountStatusChanged(AccountStatus::Available)),
            Just(Event::AccountStatusChanged(AccountStatus::NoAccount)),
            arb_operation().prop_map(Event::OperationEnqueued),
            Just(Event::OperationSucceeded(OperationResponse::SendDone(
                SendOutcome::default(),
            ))),
            Just(Event::OperationRetry(RemoteError::NetworkFailure)),
            proptest::collection::vec(arb_operation(), 0..3).prop_map(Event::OperationReplaced),
        ]
    }

    proptest! {
        /// The current queue is always the highest-priority enabled,
        /// non-empty queue, and pending count always sums the queues.
        #[test]
        fn derived_values_hold_for_any_event_sequence(
            events in proptest::collection::vec(arb_event(), 0..40)
        ) {
            let mut state = SyncState::new();
            for event in &events {
                state.apply(event);

                let expected_current = QueueKind::ALL.into_iter().find(|kind| {
                    let enabled = state.is_running()
                        && state.account_status().map(|s| s.is_available()).unwrap_or(false)
                        && match kind {
                            QueueKind::Send | QueueKind::Fetch =>
                                state.is_zone_available() && state.is_subscribed(),
                            _ => true,
                        };
                    enabled && state.queue_len(*kind) > 0
                });
                prop_assert_eq!(state.current_queue(), expected_current);

                let total: usize = QueueKind::ALL.iter().map(|k| state.queue_len(*k)).sum();
                prop_assert_eq!(state.pending_operations(), total);

                if !state.is_running() {
                    prop_assert_eq!(state.current_queue(), None);
                }
                if let Some(kind) = state.current_queue() {
                    if matches!(kind, QueueKind::Send | QueueKind::Fetch) {
                        prop_assert!(state.is_zone_available() && state.is_subscribed());
                    }
                }
            }
        }
    }
}
