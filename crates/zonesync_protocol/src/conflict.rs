//! Conflict representation and write policy.

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A rejected write: the server's stored version differs from the version
/// the client believed it was modifying.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// The version the client tried to save.
    pub client: Option<Record>,
    /// The version the server holds.
    pub server: Option<Record>,
}

impl Conflict {
    /// Creates a conflict from both versions.
    pub fn new(client: Record, server: Record) -> Self {
        Self {
            client: Some(client),
            server: Some(server),
        }
    }

    /// True when both versions are present and resolution can proceed.
    pub fn is_resolvable(&self) -> bool {
        self.client.is_some() && self.server.is_some()
    }
}

/// Which side of a conflict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictWinner {
    /// Keep the client's version (its fields overwrite the server's).
    Client,
    /// Keep the server's version unmodified.
    #[default]
    Server,
}

/// Write-conflict policy passed to the backend on every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavePolicy {
    /// Save only if the server version matches the client's change tag.
    /// Mismatches surface as per-record conflicts.
    IfUnchanged,
    /// Overwrite only the keys the client changed.
    ChangedKeys,
    /// Overwrite every key unconditionally.
    AllKeys,
}

impl Default for SavePolicy {
    fn default() -> Self {
        SavePolicy::IfUnchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolvable_requires_both_versions() {
        let full = Conflict::new(Record::new("a", "T"), Record::new("a", "T"));
        assert!(full.is_resolvable());

        let partial = Conflict {
            client: Some(Record::new("a", "T")),
            server: None,
        };
        assert!(!partial.is_resolvable());
    }

    #[test]
    fn default_policy_detects_conflicts() {
        assert_eq!(SavePolicy::default(), SavePolicy::IfUnchanged);
    }

    #[test]
    fn server_wins_by_default() {
        assert_eq!(ConflictWinner::default(), ConflictWinner::Server);
    }
}
