//! Failure classification.

use zonesync_protocol::RemoteError;

/// Recovery strategy for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Unrecoverable; stop the engine and surface the error.
    Fatal,
    /// Worth retrying after a delay.
    Transient,
    /// The zone is gone; recreate it and resubscribe.
    ZoneRecovery,
    /// The change cursor is invalid; restart the fetch from scratch.
    TokenReset,
    /// The payload was too large; split the send in half.
    Split,
    /// The account became temporarily unavailable; reclassify the status.
    AccountReclassify,
    /// An error that should only appear inside a batch response surfaced at
    /// the operation level. Backend contract violation.
    LogicFault,
    /// Not covered by any classification rule.
    Unknown,
}

/// Maps a remote error to its recovery strategy.
pub fn classify(error: &RemoteError) -> FailureClass {
    match error {
        RemoteError::NotAuthenticated
        | RemoteError::PermissionFailure
        | RemoteError::QuotaExceeded
        | RemoteError::InvalidRequest(_)
        | RemoteError::IncompatibleVersion(_) => FailureClass::Fatal,

        RemoteError::NetworkUnavailable
        | RemoteError::NetworkFailure
        | RemoteError::ServiceUnavailable { .. }
        | RemoteError::ZoneBusy { .. }
        | RemoteError::RateLimited { .. }
        | RemoteError::ResultsLost => FailureClass::Transient,

        RemoteError::ZoneNotFound | RemoteError::ZoneDeleted => FailureClass::ZoneRecovery,

        RemoteError::ChangeTokenExpired => FailureClass::TokenReset,

        RemoteError::LimitExceeded => FailureClass::Split,

        RemoteError::AccountTemporarilyUnavailable => FailureClass::AccountReclassify,

        RemoteError::RecordChanged { .. }
        | RemoteError::BatchFailed
        | RemoteError::AssetUnavailable => FailureClass::LogicFault,

        RemoteError::Unknown(_) => FailureClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fatal_errors() {
        for err in [
            RemoteError::NotAuthenticated,
            RemoteError::PermissionFailure,
            RemoteError::QuotaExceeded,
            RemoteError::InvalidRequest("bad".into()),
            RemoteError::IncompatibleVersion("v2".into()),
        ] {
            assert_eq!(classify(&err), FailureClass::Fatal, "{err}");
        }
    }

    #[test]
    fn transient_errors() {
        for err in [
            RemoteError::NetworkUnavailable,
            RemoteError::NetworkFailure,
            RemoteError::ServiceUnavailable { retry_after: None },
            RemoteError::ZoneBusy { retry_after: None },
            RemoteError::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            },
            RemoteError::ResultsLost,
        ] {
            assert_eq!(classify(&err), FailureClass::Transient, "{err}");
        }
    }

    #[test]
    fn recovery_classes() {
        assert_eq!(classify(&RemoteError::ZoneNotFound), FailureClass::ZoneRecovery);
        assert_eq!(classify(&RemoteError::ZoneDeleted), FailureClass::ZoneRecovery);
        assert_eq!(
            classify(&RemoteError::ChangeTokenExpired),
            FailureClass::TokenReset
        );
        assert_eq!(classify(&RemoteError::LimitExceeded), FailureClass::Split);
        assert_eq!(
            classify(&RemoteError::AccountTemporarilyUnavailable),
            FailureClass::AccountReclassify
        );
    }

    #[test]
    fn batch_only_errors_are_logic_faults() {
        for err in [
            RemoteError::RecordChanged {
                client: None,
                server: None,
            },
            RemoteError::BatchFailed,
            RemoteError::AssetUnavailable,
        ] {
            assert_eq!(classify(&err), FailureClass::LogicFault, "{err}");
        }
    }

    #[test]
    fn unclassified_is_unknown() {
        assert_eq!(
            classify(&RemoteError::Unknown("mystery".into())),
            FailureClass::Unknown
        );
    }
}
