//! The remote backend's error vocabulary.

use crate::record::Record;
use std::time::Duration;
use thiserror::Error;

/// Errors a remote call can surface.
///
/// This is the complete vocabulary the engine classifies into recovery
/// strategies. Per-record errors inside a batch response (`RecordChanged`,
/// `BatchFailed`, `AssetUnavailable`) should never appear as an
/// operation-level failure; the engine treats that as a contract violation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// No network connectivity.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// The request failed mid-flight.
    #[error("network failure")]
    NetworkFailure,

    /// The service is temporarily down.
    #[error("service unavailable")]
    ServiceUnavailable {
        /// Server-suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The zone is busy serving other requests.
    #[error("zone busy")]
    ZoneBusy {
        /// Server-suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The client is being rate limited.
    #[error("request rate limited")]
    RateLimited {
        /// Server-suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The request may have been processed but the response was lost.
    #[error("response lost")]
    ResultsLost,

    /// No authenticated account.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The account is not permitted to perform the request.
    #[error("permission failure")]
    PermissionFailure,

    /// The account is out of storage quota.
    #[error("quota exceeded")]
    QuotaExceeded,

    /// The server rejected the request as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client's schema or protocol version is not accepted.
    #[error("incompatible version: {0}")]
    IncompatibleVersion(String),

    /// The zone does not exist on the server.
    #[error("zone not found")]
    ZoneNotFound,

    /// The user deleted the zone out from under the client.
    #[error("zone deleted")]
    ZoneDeleted,

    /// The change cursor is no longer valid; a full refetch is required.
    #[error("change token expired")]
    ChangeTokenExpired,

    /// The request exceeded the server's size or record-count limit.
    #[error("limit exceeded")]
    LimitExceeded,

    /// The account exists but is temporarily unusable.
    #[error("account temporarily unavailable")]
    AccountTemporarilyUnavailable,

    /// The record on the server differs from the version the client
    /// modified. Only valid inside a per-record failure map.
    #[error("server record changed")]
    RecordChanged {
        /// The version the client tried to save.
        client: Option<Record>,
        /// The version the server holds.
        server: Option<Record>,
    },

    /// A sibling record in the same atomic batch failed. Only valid inside
    /// a per-record failure map.
    #[error("batch request failed")]
    BatchFailed,

    /// A referenced asset could not be served. Only valid inside a
    /// per-record failure map.
    #[error("asset unavailable")]
    AssetUnavailable,

    /// Anything the vocabulary does not cover.
    #[error("unknown remote error: {0}")]
    Unknown(String),
}

impl RemoteError {
    /// Server-provided delay before the request should be retried, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::ServiceUnavailable { retry_after }
            | RemoteError::ZoneBusy { retry_after }
            | RemoteError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_extraction() {
        let err = RemoteError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));

        assert_eq!(RemoteError::ZoneBusy { retry_after: None }.retry_after(), None);
        assert_eq!(RemoteError::NetworkFailure.retry_after(), None);
    }

    #[test]
    fn error_display() {
        assert_eq!(RemoteError::ZoneNotFound.to_string(), "zone not found");
        assert_eq!(
            RemoteError::InvalidRequest("bad field".into()).to_string(),
            "invalid request: bad field"
        );
    }
}
