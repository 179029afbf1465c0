//! Sync engine orchestrator.

use crate::backend::RemoteBackend;
use crate::config::SyncConfig;
use crate::error::{classify, FailureClass};
use crate::event::Event;
use crate::handler::OperationHandler;
use crate::observer::SyncObserver;
use crate::state::SyncState;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, warn};
use zonesync_protocol::{
    AccountStatus, ChangeToken, Conflict, ConflictWinner, FetchOutcome, Operation,
    OperationResponse, QueueKind, Record, RecordId, RemoteError, SendOutcome,
};

/// Read-only snapshot of the engine's observable state.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// The queue whose head would run next, if any.
    pub current_queue: Option<QueueKind>,
    /// Total operations across all queues.
    pub pending_operations: usize,
    /// When the last complete fetch finished.
    pub last_fetched_at: Option<Instant>,
    /// When the last send finished.
    pub last_sent_at: Option<Instant>,
    /// Last known account status.
    pub account_status: Option<AccountStatus>,
    /// True while the engine is processing queues.
    pub is_running: bool,
    /// True once the zone is known to exist.
    pub is_zone_available: bool,
    /// True once the change subscription is known to exist.
    pub is_subscribed: bool,
    /// Retries recorded for the current operation.
    pub retry_count: u32,
    /// Error that caused the most recent retry.
    pub retry_reason: Option<RemoteError>,
}

/// The single entry point for external calls and internal feedback.
///
/// Every public call becomes an [`Event`]. Events are applied to the
/// [`SyncState`] reducer under one lock, one at a time; follow-up events
/// produced by side effects drain through the same dispatch before the
/// lock is released, so no two dispatches ever interleave their mutations.
/// When the head of the highest-priority enabled queue changes, the engine
/// launches it asynchronously through the [`OperationHandler`] and feeds
/// the outcome back in as another event.
pub struct SyncEngine<B> {
    inner: Arc<EngineInner<B>>,
}

struct EngineInner<B> {
    config: SyncConfig,
    state: tokio::sync::Mutex<SyncState>,
    handler: OperationHandler<B>,
    backend: Arc<B>,
    observer: Arc<dyn SyncObserver>,
}

impl<B: RemoteBackend + 'static> SyncEngine<B> {
    /// Creates an engine for the given backend and observer.
    pub fn new(config: SyncConfig, backend: B, observer: Arc<dyn SyncObserver>) -> Self {
        let backend = Arc::new(backend);
        let handler = OperationHandler::new(Arc::clone(&backend), &config);
        Self {
            inner: Arc::new(EngineInner {
                config,
                state: tokio::sync::Mutex::new(SyncState::new()),
                handler,
                backend,
                observer,
            }),
        }
    }

    /// Begins processing queues, bootstrapping the zone and subscription
    /// if they are not known to exist.
    pub async fn start(&self) {
        self.inner.dispatch(Event::Start).await;
    }

    /// Stops processing queues. Operations already in flight are not
    /// aborted, but their outcomes no longer affect state.
    pub async fn stop(&self) {
        self.inner.dispatch(Event::Stop(None)).await;
    }

    /// Clears every queue and flag back to pristine. In-flight operations
    /// are not cancelled; their outcomes are discarded.
    pub async fn reset(&self) {
        self.inner.state.lock().await.reset();
    }

    /// Enqueues a fetch for changes since `cursor`.
    pub async fn fetch_changes(&self, cursor: Option<ChangeToken>) {
        self.inner
            .dispatch(Event::OperationEnqueued(Operation::Fetch { cursor }))
            .await;
    }

    /// Enqueues sends for the given modifications and deletions, splitting
    /// them into operations of at most `max_records_per_operation` records.
    pub async fn send_changes(&self, modifications: Vec<Record>, deletions: Vec<RecordId>) {
        let max = self.inner.config.max_records_per_operation;
        if modifications.len() + deletions.len() <= max {
            if modifications.is_empty() && deletions.is_empty() {
                return;
            }
            self.inner
                .dispatch(Event::OperationEnqueued(Operation::Send {
                    modifications,
                    deletions,
                }))
                .await;
            return;
        }

        for chunk in modifications.chunks(max) {
            self.inner
                .dispatch(Event::OperationEnqueued(Operation::Send {
                    modifications: chunk.to_vec(),
                    deletions: Vec::new(),
                }))
                .await;
        }
        for chunk in deletions.chunks(max) {
            self.inner
                .dispatch(Event::OperationEnqueued(Operation::Send {
                    modifications: Vec::new(),
                    deletions: chunk.to_vec(),
                }))
                .await;
        }
    }

    /// Feeds an account status change from the hosting environment.
    pub async fn account_status_changed(&self, status: AccountStatus) {
        self.inner
            .dispatch(Event::AccountStatusChanged(status))
            .await;
    }

    /// Consumes account status updates from a watch channel the hosting
    /// environment owns. The task ends when the sender side is dropped.
    pub fn watch_account_status(&self, mut updates: watch::Receiver<AccountStatus>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let status = *updates.borrow();
                inner.dispatch(Event::AccountStatusChanged(status)).await;
            }
        });
    }

    /// Takes a read-only snapshot of the observable state.
    pub async fn status(&self) -> EngineStatus {
        let state = self.inner.state.lock().await;
        EngineStatus {
            current_queue: state.current_queue(),
            pending_operations: state.pending_operations(),
            last_fetched_at: state.last_fetched_at(),
            last_sent_at: state.last_sent_at(),
            account_status: state.account_status(),
            is_running: state.is_running(),
            is_zone_available: state.is_zone_available(),
            is_subscribed: state.is_subscribed(),
            retry_count: state.retry_count(),
            retry_reason: state.retry_reason().cloned(),
        }
    }
}

impl<B: RemoteBackend + 'static> EngineInner<B> {
    /// Applies an event (and every follow-up event it produces) under the
    /// state lock, then launches the new current operation if it changed.
    async fn dispatch(self: &Arc<Self>, event: Event) {
        let mut pending = VecDeque::new();
        pending.push_back(event);

        let mut state = self.state.lock().await;
        while let Some(event) = pending.pop_front() {
            if event.is_operation_outcome() && !state.is_running() {
                debug!(?event, "discarding outcome, engine stopped");
                continue;
            }

            // A send that came back with conflicts is superseded by its
            // conflict-resolved replacement rather than dequeued as a
            // plain success; the reducer never sees the success event.
            let event = match event {
                Event::OperationSucceeded(OperationResponse::SendDone(outcome))
                    if !outcome.conflicts.is_empty() =>
                {
                    self.report_send(&outcome);
                    let replacements = self.resolve_conflicts(outcome.conflicts);
                    Event::OperationReplaced(replacements)
                }
                other => other,
            };

            debug!(?event, "applying event");
            // Entry identity, not operation value: two value-identical
            // operations queued back to back are still distinct heads.
            let before = state.current_operation_id();
            state.apply(&event);
            self.react(&mut state, &event, &mut pending);

            let after = state.current_operation_id();
            if after.is_some() && after != before {
                if let Some(operation) = state.current_operation().cloned() {
                    self.spawn_execution(operation, Duration::ZERO);
                }
            }
        }
    }

    /// Event-specific side effects. Follow-up events go into `pending` so
    /// they are applied inside the same dispatch.
    fn react(self: &Arc<Self>, state: &mut SyncState, event: &Event, pending: &mut VecDeque<Event>) {
        match event {
            Event::Start => {
                if !state.is_zone_available() {
                    pending.push_back(Event::OperationEnqueued(Operation::CreateZone(
                        self.config.zone.clone(),
                    )));
                }
                if !state.is_subscribed() {
                    pending.push_back(Event::OperationEnqueued(Operation::Subscribe {
                        zone: self.config.zone.clone(),
                        subscription: self.config.subscription.clone(),
                    }));
                }
                if state.account_status().is_none() || self.config.check_account_status_on_start {
                    self.spawn_status_query();
                }
            }
            Event::Stop(error) => {
                if let Some(error) = error {
                    self.observer.stopped_with_error(error.clone());
                }
            }
            Event::AccountStatusChanged(status) => {
                self.observer.account_status_changed(*status);
            }
            Event::OperationSucceeded(response) => match response {
                OperationResponse::SendDone(outcome) => self.report_send(outcome),
                OperationResponse::FetchDone(outcome) => self.report_fetch(outcome),
                OperationResponse::ZoneCreated { .. } | OperationResponse::Subscribed { .. } => {}
            },
            Event::OperationFailed(failure) => {
                self.classify_failure(state, failure, pending);
            }
            Event::OperationRetry(error) => {
                if state.retry_count() >= self.config.max_retry_attempts {
                    warn!(%error, attempts = state.retry_count(), "retries exhausted, stopping");
                    pending.push_back(Event::Stop(Some(error.clone())));
                } else if let Some(operation) = state.current_operation().cloned() {
                    let delay = error.retry_after().unwrap_or(Duration::ZERO);
                    debug!(%error, ?delay, attempt = state.retry_count(), "scheduling retry");
                    self.spawn_execution(operation, delay);
                }
            }
            Event::OperationEnqueued(_) | Event::OperationReplaced(_) => {}
        }
    }

    /// Classifies a failure into a recovery strategy and converts it into
    /// follow-up events.
    fn classify_failure(
        self: &Arc<Self>,
        state: &mut SyncState,
        failure: &RemoteError,
        pending: &mut VecDeque<Event>,
    ) {
        match classify(failure) {
            FailureClass::Fatal => {
                warn!(%failure, "fatal failure, stopping");
                pending.push_back(Event::Stop(Some(failure.clone())));
            }
            FailureClass::Transient => {
                pending.push_back(Event::OperationRetry(failure.clone()));
            }
            FailureClass::ZoneRecovery => {
                warn!(%failure, "zone lost, recreating zone and subscription");
                pending.push_back(Event::OperationEnqueued(Operation::CreateZone(
                    self.config.zone.clone(),
                )));
                pending.push_back(Event::OperationEnqueued(Operation::Subscribe {
                    zone: self.config.zone.clone(),
                    subscription: self.config.subscription.clone(),
                }));
            }
            FailureClass::TokenReset => {
                if matches!(state.current_operation(), Some(Operation::Fetch { .. })) {
                    warn!("change cursor expired, refetching from scratch");
                    self.observer.change_token_updated(None);
                    pending.push_back(Event::OperationReplaced(vec![Operation::Fetch {
                        cursor: None,
                    }]));
                } else {
                    pending.push_back(Event::Stop(Some(failure.clone())));
                }
            }
            FailureClass::Split => match state.current_operation() {
                Some(Operation::Send {
                    modifications,
                    deletions,
                }) if modifications.len() + deletions.len() > 1 => {
                    let mods_mid = (modifications.len() + 1) / 2;
                    let dels_mid = (deletions.len() + 1) / 2;
                    let first = Operation::Send {
                        modifications: modifications[..mods_mid].to_vec(),
                        deletions: deletions[..dels_mid].to_vec(),
                    };
                    let second = Operation::Send {
                        modifications: modifications[mods_mid..].to_vec(),
                        deletions: deletions[dels_mid..].to_vec(),
                    };
                    warn!(
                        total = modifications.len() + deletions.len(),
                        "payload too large, splitting send in half"
                    );
                    // Front-insertion order makes the first half the head
                    pending.push_back(Event::OperationReplaced(vec![second, first]));
                }
                _ => {
                    // A single record that exceeds the limit cannot be
                    // reduced further
                    pending.push_back(Event::Stop(Some(failure.clone())));
                }
            },
            FailureClass::AccountReclassify => {
                pending.push_back(Event::AccountStatusChanged(
                    AccountStatus::TemporarilyUnavailable,
                ));
            }
            FailureClass::LogicFault => {
                error!(%failure, "batch-level error surfaced as operation failure");
                pending.push_back(Event::Stop(Some(failure.clone())));
            }
            FailureClass::Unknown => {
                error!(%failure, "unclassified remote error");
                pending.push_back(Event::Stop(Some(failure.clone())));
            }
        }
    }

    /// Resolves a send's conflicts into the replacement operations for the
    /// superseding event: one new Send holding the resolved records, or
    /// nothing when no conflict was resolvable.
    fn resolve_conflicts(&self, conflicts: HashMap<RecordId, Conflict>) -> Vec<Operation> {
        let mut resolved = Vec::new();
        for (id, conflict) in conflicts {
            let (Some(client), Some(server)) = (conflict.client, conflict.server) else {
                warn!(%id, "conflict missing a version, dropping record");
                continue;
            };
            match self.observer.resolve_conflict(&client, &server) {
                ConflictWinner::Server => resolved.push(server),
                ConflictWinner::Client => {
                    // Keep the server's identity and change tag so the
                    // re-send is accepted, but carry the client's fields.
                    let mut merged = server;
                    merged.clear_fields();
                    merged.merge_fields_from(&client);
                    resolved.push(merged);
                }
            }
        }

        if resolved.is_empty() {
            Vec::new()
        } else {
            vec![Operation::Send {
                modifications: resolved,
                deletions: Vec::new(),
            }]
        }
    }

    fn report_send(&self, outcome: &SendOutcome) {
        if !outcome.saved.is_empty() {
            self.observer.sent_modifications(outcome.saved.clone());
        }
        if !outcome.deleted.is_empty() {
            self.observer.sent_deletions(outcome.deleted.clone());
        }
        if !outcome.failures.is_empty() {
            self.observer.send_record_failures(outcome.failures.clone());
        }
    }

    fn report_fetch(&self, outcome: &FetchOutcome) {
        if outcome.new_cursor.is_some() {
            self.observer
                .change_token_updated(outcome.new_cursor.clone());
        }
        if !outcome.deletions.is_empty() {
            self.observer.fetched_deletions(outcome.deletions.clone());
        }
        if !outcome.modifications.is_empty() {
            self.observer
                .fetched_modifications(outcome.modifications.clone());
        }
        if !outcome.failures.is_empty() {
            self.observer.fetch_record_failures(outcome.failures.clone());
        }
    }

    /// Launches the operation on the runtime; the outcome re-enters the
    /// dispatch loop as a new event.
    fn spawn_execution(self: &Arc<Self>, operation: Operation, delay: Duration) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            match inner.handler.execute(operation).await {
                Ok(response) => inner.dispatch(Event::OperationSucceeded(response)).await,
                Err(failure) => inner.dispatch(Event::OperationFailed(failure)).await,
            }
        });
    }

    /// Queries the account status off the dispatch path and feeds the
    /// answer back in as an event.
    fn spawn_status_query(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let status = match inner.backend.account_status().await {
                Ok(status) => status,
                Err(error) => {
                    warn!(%error, "account status query failed");
                    AccountStatus::CouldNotDetermine
                }
            };
            inner.dispatch(Event::AccountStatusChanged(status)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::observer::RecordingObserver;

    fn engine_with(
        config: SyncConfig,
        backend: MockBackend,
    ) -> (SyncEngine<MockBackend>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let engine = SyncEngine::new(config, backend, observer.clone() as Arc<dyn SyncObserver>);
        (engine, observer)
    }

    /// Yields until the engine has no pending work or gives up.
    async fn settle(engine: &SyncEngine<MockBackend>) {
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let status = engine.status().await;
            if status.pending_operations == 0 || status.current_queue.is_none() {
                // Give spawned outcomes one more chance to land
                tokio::time::sleep(Duration::from_millis(50)).await;
                if engine.status().await.pending_operations == 0
                    || engine.status().await.current_queue.is_none()
                {
                    return;
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn status_snapshot_starts_pristine() {
        let (engine, _) = engine_with(SyncConfig::default(), MockBackend::new());
        let status = engine.status().await;
        assert!(!status.is_running);
        assert_eq!(status.pending_operations, 0);
        assert_eq!(status.current_queue, None);
        assert_eq!(status.retry_count, 0);
        assert_eq!(status.account_status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_send_enqueues_nothing() {
        let (engine, _) = engine_with(SyncConfig::default(), MockBackend::new());
        engine.send_changes(vec![], vec![]).await;
        assert_eq!(engine.status().await.pending_operations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_bootstraps_zone_and_subscription() {
        let (engine, observer) = engine_with(SyncConfig::default(), MockBackend::new());
        engine.start().await;
        settle(&engine).await;

        let status = engine.status().await;
        assert!(status.is_running);
        assert!(status.is_zone_available);
        assert!(status.is_subscribed);
        assert_eq!(status.pending_operations, 0);
        assert_eq!(status.account_status, Some(AccountStatus::Available));
        assert_eq!(*observer.statuses.lock(), vec![AccountStatus::Available]);
    }

    #[tokio::test(start_paused = true)]
    async fn presplit_chunks_modifications_then_deletions() {
        let config = SyncConfig::default()
            .with_max_records_per_operation(2)
            .with_account_status_check(false);
        let backend = MockBackend::new();
        backend.set_zone_exists(true);
        backend.set_subscription_exists(true);
        let (engine, _) = engine_with(config, backend);

        let modifications: Vec<Record> =
            (0..5).map(|i| Record::new(format!("m{i}"), "T")).collect();
        let deletions: Vec<RecordId> = (0..3).map(|i| RecordId::new(format!("d{i}"))).collect();
        engine.send_changes(modifications, deletions).await;

        let status = engine.status().await;
        // ceil(5/2) + ceil(3/2) sends
        assert_eq!(status.pending_operations, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn account_unavailable_gates_queues_without_stopping() {
        let backend = MockBackend::new();
        backend.push_status(Ok(AccountStatus::TemporarilyUnavailable));
        let (engine, observer) = engine_with(SyncConfig::default(), backend);

        engine.start().await;
        settle(&engine).await;

        let status = engine.status().await;
        assert!(status.is_running);
        assert_eq!(
            status.account_status,
            Some(AccountStatus::TemporarilyUnavailable)
        );
        assert_eq!(status.current_queue, None);
        // Bootstrap operations stay parked until the account comes back
        assert_eq!(status.pending_operations, 2);
        assert_eq!(
            *observer.statuses.lock(),
            vec![AccountStatus::TemporarilyUnavailable]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn watch_channel_feeds_status_changes() {
        let (engine, _) = engine_with(
            SyncConfig::default().with_account_status_check(false),
            MockBackend::new(),
        );
        let (tx, rx) = watch::channel(AccountStatus::CouldNotDetermine);
        engine.watch_account_status(rx);

        tx.send(AccountStatus::Available).unwrap();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if engine.status().await.account_status == Some(AccountStatus::Available) {
                return;
            }
        }
        panic!("status update never arrived");
    }
}
