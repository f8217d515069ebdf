pub mod json_backend;
pub mod memory;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::OwnerId;
use crate::errors::Result;

pub use json_backend::JsonStore;
pub use memory::MemoryStore;

/// Collections the core persists, one namespace per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Accounts,
    Balances,
    Cards,
    Transactions,
    RecurringItems,
    Budgets,
    BudgetConfigs,
    Alerts,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Accounts,
        Collection::Balances,
        Collection::Cards,
        Collection::Transactions,
        Collection::RecurringItems,
        Collection::Budgets,
        Collection::BudgetConfigs,
        Collection::Alerts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::Balances => "balances",
            Collection::Cards => "cards",
            Collection::Transactions => "transactions",
            Collection::RecurringItems => "recurring_items",
            Collection::Budgets => "budgets",
            Collection::BudgetConfigs => "budget_configs",
            Collection::Alerts => "alerts",
        }
    }
}

/// Envelope around a stored record.
///
/// `version` increments on every write to this document and backs per-document
/// compare-and-swap. `sequence` is a store-wide monotonic insertion counter;
/// it is the explicit tie-break for records sharing a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub key: String,
    pub owner: OwnerId,
    pub version: u64,
    pub sequence: u64,
    pub body: serde_json::Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Pushed to subscribed listeners after a mutation commits.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub document: Document,
}

pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Key used by the per-owner singleton helpers (budget config).
pub const SINGLETON_KEY: &str = "config";

/// Abstraction over the remotely-synchronized document store.
///
/// Every operation is owner-scoped. `insert_cas` and `update` are the
/// optimistic-concurrency primitives: a writer reads, computes, and writes
/// conditionally, retrying on `Conflict` instead of blindly incrementing.
pub trait DocumentStore: Send + Sync {
    fn list(&self, collection: Collection, owner: &OwnerId) -> Result<Vec<Document>>;

    fn get(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<Option<Document>>;

    /// Fails with `Conflict` when the key already exists.
    fn insert(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document>;

    /// Insert that fails with `Conflict` when the (collection, owner)
    /// version moved since `expected_version` was read. Guards read-compute-
    /// append cycles against lost updates.
    fn insert_cas(
        &self,
        collection: Collection,
        owner: &OwnerId,
        expected_version: u64,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document>;

    /// Per-document compare-and-swap; fails with `Conflict` on a version
    /// mismatch and `NotFound` when the document is missing.
    fn update(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        expected_version: u64,
        body: serde_json::Value,
    ) -> Result<Document>;

    fn delete(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<()>;

    /// Version of the whole (collection, owner) namespace; bumped by every
    /// mutation within it.
    fn collection_version(&self, collection: Collection, owner: &OwnerId) -> Result<u64>;

    /// Push notification on every committed mutation in (collection, owner).
    /// Dropping the returned subscription unregisters the listener.
    fn subscribe(&self, collection: Collection, owner: &OwnerId, listener: Listener)
        -> Subscription;

    fn get_singleton(&self, collection: Collection, owner: &OwnerId) -> Result<Option<Document>> {
        self.get(collection, owner, SINGLETON_KEY)
    }

    fn put_singleton(
        &self,
        collection: Collection,
        owner: &OwnerId,
        body: serde_json::Value,
    ) -> Result<Document> {
        match self.get(collection, owner, SINGLETON_KEY)? {
            Some(existing) => {
                self.update(collection, owner, SINGLETON_KEY, existing.version, body)
            }
            None => self.insert(collection, owner, SINGLETON_KEY, body),
        }
    }
}

/// Shared listener bookkeeping for store backends.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, ListenerEntry>>,
}

struct ListenerEntry {
    collection: Collection,
    owner: OwnerId,
    listener: Listener,
}

impl ListenerRegistry {
    pub fn register(
        self: &Arc<Self>,
        collection: Collection,
        owner: OwnerId,
        listener: Listener,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().expect("listener registry poisoned").insert(
            id,
            ListenerEntry {
                collection,
                owner,
                listener,
            },
        );
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn unregister(&self, id: u64) {
        self.entries.lock().expect("listener registry poisoned").remove(&id);
    }

    /// Fan an event out to matching listeners. Callbacks run outside the
    /// registry lock so a listener may call back into the store.
    pub fn notify(&self, event: &ChangeEvent) {
        let matching: Vec<Listener> = {
            let entries = self.entries.lock().expect("listener registry poisoned");
            entries
                .values()
                .filter(|entry| {
                    entry.collection == event.collection && entry.owner == event.document.owner
                })
                .map(|entry| Arc::clone(&entry.listener))
                .collect()
        };
        for listener in matching {
            listener(event);
        }
    }
}

/// Handle for an active change listener; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}
