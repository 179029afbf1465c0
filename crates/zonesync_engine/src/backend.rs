//! Remote backend abstraction.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use zonesync_protocol::{
    AccountStatus, ChangeToken, FetchOutcome, Record, RecordId, RemoteError, SavePolicy,
    SendOutcome, SubscriptionId, ZoneId,
};

/// Result of probing for a zone or subscription.
///
/// `Missing` means "does not exist yet" and is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The object exists on the server.
    Exists,
    /// The object has not been created yet.
    Missing,
}

/// The remote record store the engine executes operations against.
///
/// This trait abstracts the network layer, allowing different
/// implementations (a real cloud store, a mock for testing).
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Checks whether the zone exists.
    async fn probe_zone(&self, zone: &ZoneId) -> Result<ProbeResult, RemoteError>;

    /// Creates the zone.
    async fn create_zone(&self, zone: &ZoneId) -> Result<(), RemoteError>;

    /// Checks whether the change subscription exists.
    async fn probe_subscription(
        &self,
        zone: &ZoneId,
        subscription: &SubscriptionId,
    ) -> Result<ProbeResult, RemoteError>;

    /// Registers the change subscription for the zone.
    async fn create_subscription(
        &self,
        zone: &ZoneId,
        subscription: &SubscriptionId,
    ) -> Result<(), RemoteError>;

    /// Fetches changes since the cursor.
    async fn fetch_changes(
        &self,
        zone: &ZoneId,
        cursor: Option<&ChangeToken>,
    ) -> Result<FetchOutcome, RemoteError>;

    /// Saves and deletes records under the given write-conflict policy.
    async fn modify_records(
        &self,
        zone: &ZoneId,
        save: Vec<Record>,
        delete: Vec<RecordId>,
        policy: SavePolicy,
    ) -> Result<SendOutcome, RemoteError>;

    /// Queries the account status.
    async fn account_status(&self) -> Result<AccountStatus, RemoteError>;
}

#[async_trait]
impl<B: RemoteBackend + ?Sized> RemoteBackend for std::sync::Arc<B> {
    async fn probe_zone(&self, zone: &ZoneId) -> Result<ProbeResult, RemoteError> {
        (**self).probe_zone(zone).await
    }

    async fn create_zone(&self, zone: &ZoneId) -> Result<(), RemoteError> {
        (**self).create_zone(zone).await
    }

    async fn probe_subscription(
        &self,
        zone: &ZoneId,
        subscription: &SubscriptionId,
    ) -> Result<ProbeResult, RemoteError> {
        (**self).probe_subscription(zone, subscription).await
    }

    async fn create_subscription(
        &self,
        zone: &ZoneId,
        subscription: &SubscriptionId,
    ) -> Result<(), RemoteError> {
        (**self).create_subscription(zone, subscription).await
    }

    async fn fetch_changes(
        &self,
        zone: &ZoneId,
        cursor: Option<&ChangeToken>,
    ) -> Result<FetchOutcome, RemoteError> {
        (**self).fetch_changes(zone, cursor).await
    }

    async fn modify_records(
        &self,
        zone: &ZoneId,
        save: Vec<Record>,
        delete: Vec<RecordId>,
        policy: SavePolicy,
    ) -> Result<SendOutcome, RemoteError> {
        (**self).modify_records(zone, save, delete, policy).await
    }

    async fn account_status(&self) -> Result<AccountStatus, RemoteError> {
        (**self).account_status().await
    }
}

/// A scriptable backend for testing.
///
/// Each method first drains its script queue; with an empty script it falls
/// back to plain in-memory behavior (zone/subscription existence flags, an
/// echo of saved records, empty fetches, an available account).
#[derive(Default)]
pub struct MockBackend {
    zone_exists: Mutex<bool>,
    subscription_exists: Mutex<bool>,

    probe_zone_script: Mutex<VecDeque<Result<ProbeResult, RemoteError>>>,
    create_zone_script: Mutex<VecDeque<Result<(), RemoteError>>>,
    probe_subscription_script: Mutex<VecDeque<Result<ProbeResult, RemoteError>>>,
    create_subscription_script: Mutex<VecDeque<Result<(), RemoteError>>>,
    fetch_script: Mutex<VecDeque<Result<FetchOutcome, RemoteError>>>,
    modify_script: Mutex<VecDeque<Result<SendOutcome, RemoteError>>>,
    status_script: Mutex<VecDeque<Result<AccountStatus, RemoteError>>>,

    modify_batches: Mutex<Vec<(Vec<Record>, Vec<RecordId>)>>,
    fetch_cursors: Mutex<Vec<Option<ChangeToken>>>,
}

impl MockBackend {
    /// Creates a mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the zone as already existing.
    pub fn set_zone_exists(&self, exists: bool) {
        *self.zone_exists.lock() = exists;
    }

    /// Marks the subscription as already existing.
    pub fn set_subscription_exists(&self, exists: bool) {
        *self.subscription_exists.lock() = exists;
    }

    /// Scripts the next zone probe result.
    pub fn push_probe_zone(&self, result: Result<ProbeResult, RemoteError>) {
        self.probe_zone_script.lock().push_back(result);
    }

    /// Scripts the next zone creation result.
    pub fn push_create_zone(&self, result: Result<(), RemoteError>) {
        self.create_zone_script.lock().push_back(result);
    }

    /// Scripts the next subscription probe result.
    pub fn push_probe_subscription(&self, result: Result<ProbeResult, RemoteError>) {
        self.probe_subscription_script.lock().push_back(result);
    }

    /// Scripts the next subscription creation result.
    pub fn push_create_subscription(&self, result: Result<(), RemoteError>) {
        self.create_subscription_script.lock().push_back(result);
    }

    /// Scripts the next fetch result.
    pub fn push_fetch(&self, result: Result<FetchOutcome, RemoteError>) {
        self.fetch_script.lock().push_back(result);
    }

    /// Scripts the next modify result.
    pub fn push_modify(&self, result: Result<SendOutcome, RemoteError>) {
        self.modify_script.lock().push_back(result);
    }

    /// Scripts the next account status result.
    pub fn push_status(&self, result: Result<AccountStatus, RemoteError>) {
        self.status_script.lock().push_back(result);
    }

    /// Every save/delete batch passed to `modify_records`, in call order.
    pub fn modify_batches(&self) -> Vec<(Vec<Record>, Vec<RecordId>)> {
        self.modify_batches.lock().clone()
    }

    /// Every cursor passed to `fetch_changes`, in call order.
    pub fn fetch_cursors(&self) -> Vec<Option<ChangeToken>> {
        self.fetch_cursors.lock().clone()
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn probe_zone(&self, _zone: &ZoneId) -> Result<ProbeResult, RemoteError> {
        if let Some(scripted) = self.probe_zone_script.lock().pop_front() {
            return scripted;
        }
        Ok(if *self.zone_exists.lock() {
            ProbeResult::Exists
        } else {
            ProbeResult::Missing
        })
    }

    async fn create_zone(&self, _zone: &ZoneId) -> Result<(), RemoteError> {
        if let Some(scripted) = self.create_zone_script.lock().pop_front() {
            return scripted;
        }
        *self.zone_exists.lock() = true;
        Ok(())
    }

    async fn probe_subscription(
        &self,
        _zone: &ZoneId,
        _subscription: &SubscriptionId,
    ) -> Result<ProbeResult, RemoteError> {
        if let Some(scripted) = self.probe_subscription_script.lock().pop_front() {
            return scripted;
        }
        Ok(if *self.subscription_exists.lock() {
            ProbeResult::Exists
        } else {
            ProbeResult::Missing
        })
    }

    async fn create_subscription(
        &self,
        _zone: &ZoneId,
        _subscription: &SubscriptionId,
    ) -> Result<(), RemoteError> {
        if let Some(scripted) = self.create_subscription_script.lock().pop_front() {
            return scripted;
        }
        *self.subscription_exists.lock() = true;
        Ok(())
    }

    async fn fetch_changes(
        &self,
        _zone: &ZoneId,
        cursor: Option<&ChangeToken>,
    ) -> Result<FetchOutcome, RemoteError> {
        self.fetch_cursors.lock().push(cursor.cloned());
        if let Some(scripted) = self.fetch_script.lock().pop_front() {
            return scripted;
        }
        Ok(FetchOutcome::empty(cursor.cloned()))
    }

    async fn modify_records(
        &self,
        _zone: &ZoneId,
        save: Vec<Record>,
        delete: Vec<RecordId>,
        _policy: SavePolicy,
    ) -> Result<SendOutcome, RemoteError> {
        self.modify_batches.lock().push((save.clone(), delete.clone()));
        if let Some(scripted) = self.modify_script.lock().pop_front() {
            return scripted;
        }
        Ok(SendOutcome::accepted(save, delete))
    }

    async fn account_status(&self) -> Result<AccountStatus, RemoteError> {
        if let Some(scripted) = self.status_script.lock().pop_front() {
            return scripted;
        }
        Ok(AccountStatus::Available)
    }
}
