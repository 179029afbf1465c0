//! # ZoneSync Protocol
//!
//! Shared vocabulary between the ZoneSync engine and its remote backend.
//!
//! This crate provides:
//! - Record, field, and identifier value types
//! - Operation and response tagged unions (the four queue kinds)
//! - Conflict representation and the write-conflict save policy
//! - Account status
//! - The remote error vocabulary the engine classifies
//!
//! Everything here is pure data: no behavior beyond constructors, accessors,
//! and the field-merge helper conflict resolution relies on. Marshalling of
//! domain objects into records and persistence of change tokens belong to
//! the host application, not this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod error;
mod operation;
mod record;
mod response;
mod status;

pub use conflict::{Conflict, ConflictWinner, SavePolicy};
pub use error::RemoteError;
pub use operation::{Operation, QueueKind};
pub use record::{ChangeToken, FieldValue, Record, RecordId, SubscriptionId, ZoneId};
pub use response::{FetchOutcome, OperationResponse, SendOutcome};
pub use status::AccountStatus;
