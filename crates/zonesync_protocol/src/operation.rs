//! Sync operations and queue kinds.

use crate::record::{ChangeToken, Record, RecordId, SubscriptionId, ZoneId};
use serde::{Deserialize, Serialize};

/// The four operation categories, in fixed priority order.
///
/// Zone creation outranks subscription setup, which outranks sending local
/// changes, which outranks fetching remote changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    /// Create the record zone.
    CreateZone,
    /// Register the change subscription.
    Subscribe,
    /// Send local modifications and deletions.
    Send,
    /// Fetch remote changes since a cursor.
    Fetch,
}

impl QueueKind {
    /// All kinds, highest priority first.
    pub const ALL: [QueueKind; 4] = [
        QueueKind::CreateZone,
        QueueKind::Subscribe,
        QueueKind::Send,
        QueueKind::Fetch,
    ];

    /// Numeric priority; lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            QueueKind::CreateZone => 0,
            QueueKind::Subscribe => 1,
            QueueKind::Send => 2,
            QueueKind::Fetch => 3,
        }
    }
}

/// A single unit of work against the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create the zone if it does not exist.
    CreateZone(ZoneId),
    /// Register the change subscription for a zone.
    Subscribe {
        /// Zone to subscribe to.
        zone: ZoneId,
        /// Subscription identity.
        subscription: SubscriptionId,
    },
    /// Save modified records and delete removed ones.
    Send {
        /// Records to save.
        modifications: Vec<Record>,
        /// Record ids to delete.
        deletions: Vec<RecordId>,
    },
    /// Fetch changes since the cursor (`None` fetches from the beginning).
    Fetch {
        /// Position to fetch from.
        cursor: Option<ChangeToken>,
    },
}

impl Operation {
    /// The queue this operation belongs to.
    pub fn kind(&self) -> QueueKind {
        match self {
            Operation::CreateZone(_) => QueueKind::CreateZone,
            Operation::Subscribe { .. } => QueueKind::Subscribe,
            Operation::Send { .. } => QueueKind::Send,
            Operation::Fetch { .. } => QueueKind::Fetch,
        }
    }

    /// Total records touched by a Send; zero for other kinds.
    pub fn record_count(&self) -> usize {
        match self {
            Operation::Send {
                modifications,
                deletions,
            } => modifications.len() + deletions.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_fixed() {
        let priorities: Vec<u8> = QueueKind::ALL.iter().map(|k| k.priority()).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3]);
    }

    #[test]
    fn operation_kinds() {
        assert_eq!(
            Operation::CreateZone(ZoneId::new("z")).kind(),
            QueueKind::CreateZone
        );
        assert_eq!(
            Operation::Subscribe {
                zone: ZoneId::new("z"),
                subscription: SubscriptionId::new("s"),
            }
            .kind(),
            QueueKind::Subscribe
        );
        assert_eq!(
            Operation::Send {
                modifications: vec![],
                deletions: vec![],
            }
            .kind(),
            QueueKind::Send
        );
        assert_eq!(Operation::Fetch { cursor: None }.kind(), QueueKind::Fetch);
    }

    #[test]
    fn record_count_spans_both_lists() {
        let op = Operation::Send {
            modifications: vec![Record::new("a", "T"), Record::new("b", "T")],
            deletions: vec![RecordId::from("c")],
        };
        assert_eq!(op.record_count(), 3);
        assert_eq!(Operation::Fetch { cursor: None }.record_count(), 0);
    }
}
