//! Outbound notification capability.

use parking_lot::Mutex;
use std::collections::HashMap;
use zonesync_protocol::{
    AccountStatus, ChangeToken, ConflictWinner, Record, RecordId, RemoteError,
};

/// Host-facing notifications from the engine.
///
/// Held as a non-owning reference; every call is best-effort and must
/// return quickly, since notifications run inside the engine's dispatch.
/// All methods default to no-ops except [`SyncObserver::resolve_conflict`],
/// which defaults to server-wins.
pub trait SyncObserver: Send + Sync {
    /// The account status changed.
    fn account_status_changed(&self, _status: AccountStatus) {}

    /// The engine stopped because of an unrecoverable error.
    fn stopped_with_error(&self, _error: RemoteError) {}

    /// A fetch produced a new change cursor (`None` after a cursor reset).
    fn change_token_updated(&self, _token: Option<ChangeToken>) {}

    /// A fetch delivered modified records.
    fn fetched_modifications(&self, _records: Vec<Record>) {}

    /// A fetch delivered deletions.
    fn fetched_deletions(&self, _ids: Vec<RecordId>) {}

    /// A fetch could not materialize some records.
    fn fetch_record_failures(&self, _failures: HashMap<RecordId, RemoteError>) {}

    /// A send saved records (with fresh change tags).
    fn sent_modifications(&self, _records: Vec<Record>) {}

    /// A send deleted records.
    fn sent_deletions(&self, _ids: Vec<RecordId>) {}

    /// A send failed for some records (conflicts excluded; those are
    /// resolved through [`SyncObserver::resolve_conflict`]).
    fn send_record_failures(&self, _failures: HashMap<RecordId, RemoteError>) {}

    /// Picks the winner of a write conflict.
    fn resolve_conflict(&self, _client: &Record, _server: &Record) -> ConflictWinner {
        ConflictWinner::Server
    }
}

/// An observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {}

/// An observer that records every notification, for tests.
#[derive(Default)]
pub struct RecordingObserver {
    /// Status changes, in order.
    pub statuses: Mutex<Vec<AccountStatus>>,
    /// Stop errors, in order.
    pub stop_errors: Mutex<Vec<RemoteError>>,
    /// Cursor updates, in order.
    pub tokens: Mutex<Vec<Option<ChangeToken>>>,
    /// Fetched record batches.
    pub fetched: Mutex<Vec<Vec<Record>>>,
    /// Fetched deletion batches.
    pub fetched_deleted: Mutex<Vec<Vec<RecordId>>>,
    /// Fetch failure maps.
    pub fetch_failures: Mutex<Vec<HashMap<RecordId, RemoteError>>>,
    /// Sent record batches.
    pub sent: Mutex<Vec<Vec<Record>>>,
    /// Sent deletion batches.
    pub sent_deleted: Mutex<Vec<Vec<RecordId>>>,
    /// Send failure maps.
    pub send_failures: Mutex<Vec<HashMap<RecordId, RemoteError>>>,
    /// Conflict pairs presented for resolution.
    pub conflicts_seen: Mutex<Vec<(Record, Record)>>,
    /// Winner handed back for every conflict.
    pub winner: Mutex<ConflictWinner>,
}

impl RecordingObserver {
    /// Creates a recorder that resolves conflicts in the server's favor.
    pub fn new() -> Self {
        Self {
            winner: Mutex::new(ConflictWinner::Server),
            ..Default::default()
        }
    }

    /// Sets the winner returned for subsequent conflicts.
    pub fn set_winner(&self, winner: ConflictWinner) {
        *self.winner.lock() = winner;
    }
}

impl SyncObserver for RecordingObserver {
    fn account_status_changed(&self, status: AccountStatus) {
        self.statuses.lock().push(status);
    }

    fn stopped_with_error(&self, error: RemoteError) {
        self.stop_errors.lock().push(error);
    }

    fn change_token_updated(&self, token: Option<ChangeToken>) {
        self.tokens.lock().push(token);
    }

    fn fetched_modifications(&self, records: Vec<Record>) {
        self.fetched.lock().push(records);
    }

    fn fetched_deletions(&self, ids: Vec<RecordId>) {
        self.fetched_deleted.lock().push(ids);
    }

    fn fetch_record_failures(&self, failures: HashMap<RecordId, RemoteError>) {
        self.fetch_failures.lock().push(failures);
    }

    fn sent_modifications(&self, records: Vec<Record>) {
        self.sent.lock().push(records);
    }

    fn sent_deletions(&self, ids: Vec<RecordId>) {
        self.sent_deleted.lock().push(ids);
    }

    fn send_record_failures(&self, failures: HashMap<RecordId, RemoteError>) {
        self.send_failures.lock().push(failures);
    }

    fn resolve_conflict(&self, client: &Record, server: &Record) -> ConflictWinner {
        self.conflicts_seen
            .lock()
            .push((client.clone(), server.clone()));
        *self.winner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resolution_is_server_wins() {
        let observer = NullObserver;
        let client = Record::new("a", "T");
        let server = Record::new("a", "T");
        assert_eq!(
            observer.resolve_conflict(&client, &server),
            ConflictWinner::Server
        );
    }

    #[test]
    fn recorder_captures_notifications() {
        let observer = RecordingObserver::new();
        observer.account_status_changed(AccountStatus::Available);
        observer.stopped_with_error(RemoteError::QuotaExceeded);
        observer.set_winner(ConflictWinner::Client);

        let client = Record::new("a", "T");
        let server = Record::new("a", "T");
        assert_eq!(
            observer.resolve_conflict(&client, &server),
            ConflictWinner::Client
        );

        assert_eq!(*observer.statuses.lock(), vec![AccountStatus::Available]);
        assert_eq!(*observer.stop_errors.lock(), vec![RemoteError::QuotaExceeded]);
        assert_eq!(observer.conflicts_seen.lock().len(), 1);
    }
}
