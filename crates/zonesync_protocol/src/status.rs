//! Account status reported by the remote backend.

use serde::{Deserialize, Serialize};

/// The state of the user's account with the remote store.
///
/// Only `Available` permits sync work; every other status disables all
/// queues until the hosting environment reports a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Signed in and usable.
    Available,
    /// No account is configured on this device.
    NoAccount,
    /// The account exists but is restricted (e.g. parental controls).
    Restricted,
    /// The account exists but cannot be used right now.
    TemporarilyUnavailable,
    /// The status could not be determined.
    CouldNotDetermine,
}

impl AccountStatus {
    /// True when sync work may proceed.
    pub fn is_available(&self) -> bool {
        matches!(self, AccountStatus::Available)
    }
}
