//! Operation responses.

use crate::conflict::Conflict;
use crate::error::RemoteError;
use crate::record::{ChangeToken, Record, RecordId};
use std::collections::HashMap;

/// Outcome of one completed operation, mirroring [`crate::Operation`].
#[derive(Debug, Clone)]
pub enum OperationResponse {
    /// Zone creation finished.
    ZoneCreated {
        /// True when the probe found the zone already present.
        already_existed: bool,
    },
    /// Subscription registration finished.
    Subscribed {
        /// True when the probe found the subscription already present.
        already_existed: bool,
    },
    /// A send finished (possibly with per-record conflicts or failures).
    SendDone(SendOutcome),
    /// A fetch finished.
    FetchDone(FetchOutcome),
}

/// Result of saving modifications and deletions.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    /// Records the server accepted, with fresh change tags.
    pub saved: Vec<Record>,
    /// Record ids the server deleted.
    pub deleted: Vec<RecordId>,
    /// Per-record write conflicts.
    pub conflicts: HashMap<RecordId, Conflict>,
    /// Per-record failures other than conflicts.
    pub failures: HashMap<RecordId, RemoteError>,
}

impl SendOutcome {
    /// An outcome where every record was accepted.
    pub fn accepted(saved: Vec<Record>, deleted: Vec<RecordId>) -> Self {
        Self {
            saved,
            deleted,
            ..Default::default()
        }
    }
}

/// Result of fetching changes since a cursor.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Records modified since the cursor.
    pub modifications: Vec<Record>,
    /// Records that could not be materialized.
    pub failures: HashMap<RecordId, RemoteError>,
    /// Record ids deleted since the cursor.
    pub deletions: Vec<RecordId>,
    /// Cursor to resume from.
    pub new_cursor: Option<ChangeToken>,
    /// True when another fetch is needed to drain remaining changes.
    pub more_pending: bool,
}

impl FetchOutcome {
    /// An outcome carrying only a new cursor (no changes).
    pub fn empty(new_cursor: Option<ChangeToken>) -> Self {
        Self {
            modifications: Vec::new(),
            failures: HashMap::new(),
            deletions: Vec::new(),
            new_cursor,
            more_pending: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_outcome_has_no_failures() {
        let outcome = SendOutcome::accepted(vec![Record::new("a", "T")], vec!["b".into()]);
        assert_eq!(outcome.saved.len(), 1);
        assert_eq!(outcome.deleted.len(), 1);
        assert!(outcome.conflicts.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn empty_fetch_carries_cursor() {
        let outcome = FetchOutcome::empty(Some(ChangeToken::new(vec![9])));
        assert!(outcome.modifications.is_empty());
        assert!(!outcome.more_pending);
        assert_eq!(outcome.new_cursor, Some(ChangeToken::new(vec![9])));
    }
}
