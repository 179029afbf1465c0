//! # ZoneSync Engine
//!
//! Client-side synchronization engine for a zone-partitioned remote record
//! store over an unreliable, rate-limited network.
//!
//! This crate provides:
//! - Priority-ordered operation queues with capability gating
//! - A pure event/state reducer
//! - An orchestrator that classifies failures into recovery strategies
//!   (retry, batch split, pagination continuation, zone recreation,
//!   conflict resolution)
//! - Adaptive rate limiting and bounded request concurrency
//!
//! ## Architecture
//!
//! Every external call and every internal feedback signal is an [`Event`].
//! The [`SyncEngine`] funnels all events through a single serialization
//! point: each event is applied atomically to the [`SyncState`] reducer,
//! side effects run, and if the head of the highest-priority enabled queue
//! changed, the engine launches it through the [`OperationHandler`], which
//! reports a new event back into the same loop.
//!
//! ## Key Invariants
//!
//! - Fixed queue priority: CreateZone > Subscribe > Send > Fetch
//! - Send/Fetch run only once the zone exists and the subscription is live
//! - No two events are ever applied concurrently
//! - Classified errors are absorbed; only stop-with-error reaches the host

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod engine;
mod error;
mod event;
mod gate;
mod handler;
mod observer;
mod state;
mod throttle;

pub use backend::{MockBackend, ProbeResult, RemoteBackend};
pub use config::SyncConfig;
pub use engine::{EngineStatus, SyncEngine};
pub use error::{classify, FailureClass};
pub use event::Event;
pub use gate::{ConcurrencyGate, GatePermit};
pub use handler::OperationHandler;
pub use observer::{NullObserver, RecordingObserver, SyncObserver};
pub use state::SyncState;
pub use throttle::AdaptiveThrottle;
