use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::domain::OwnerId;
use crate::errors::{FinanceError, Result};

use super::{
    ChangeEvent, ChangeKind, Collection, Document, DocumentStore, Listener, ListenerRegistry,
    Subscription,
};

/// In-memory document store. Canonical backend for tests and the state the
/// file-backed store keeps warm.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    listeners: Arc<ListenerRegistry>,
}

#[derive(Default)]
struct State {
    collections: HashMap<Namespace, BTreeMap<String, Document>>,
    versions: HashMap<Namespace, u64>,
    next_sequence: u64,
}

type Namespace = (Collection, OwnerId);

impl State {
    fn bump_version(&mut self, namespace: &Namespace) -> u64 {
        let version = self.versions.entry(namespace.clone()).or_insert(0);
        *version += 1;
        *version
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from persisted documents; used by backends that load
    /// from disk. Versions and sequences are preserved.
    pub(crate) fn seed(
        &self,
        collection: Collection,
        owner: OwnerId,
        namespace_version: u64,
        documents: Vec<Document>,
    ) {
        let mut state = self.state.write().expect("store state poisoned");
        let namespace = (collection, owner);
        let highest = documents.iter().map(|d| d.sequence).max().unwrap_or(0);
        state.next_sequence = state.next_sequence.max(highest);
        state.versions.insert(namespace.clone(), namespace_version);
        let entries = documents.into_iter().map(|d| (d.key.clone(), d)).collect();
        state.collections.insert(namespace, entries);
    }

    pub(crate) fn sequence_floor(&self) -> u64 {
        self.state.read().expect("store state poisoned").next_sequence
    }

    pub(crate) fn set_sequence_floor(&self, floor: u64) {
        let mut state = self.state.write().expect("store state poisoned");
        state.next_sequence = state.next_sequence.max(floor);
    }

    fn emit(&self, event: ChangeEvent) {
        self.listeners.notify(&event);
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self, collection: Collection, owner: &OwnerId) -> Result<Vec<Document>> {
        let state = self.state.read().expect("store state poisoned");
        Ok(state
            .collections
            .get(&(collection, owner.clone()))
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<Option<Document>> {
        let state = self.state.read().expect("store state poisoned");
        Ok(state
            .collections
            .get(&(collection, owner.clone()))
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn insert(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = {
            let mut state = self.state.write().expect("store state poisoned");
            let namespace = (collection, owner.clone());
            if state
                .collections
                .get(&namespace)
                .is_some_and(|entries| entries.contains_key(key))
            {
                return Err(FinanceError::conflict(collection.name(), key));
            }
            let sequence = state.next_sequence();
            state.bump_version(&namespace);
            let document = Document {
                key: key.to_string(),
                owner: owner.clone(),
                version: 1,
                sequence,
                body,
            };
            state
                .collections
                .entry(namespace)
                .or_default()
                .insert(key.to_string(), document.clone());
            document
        };
        self.emit(ChangeEvent {
            collection,
            kind: ChangeKind::Created,
            document: document.clone(),
        });
        Ok(document)
    }

    fn insert_cas(
        &self,
        collection: Collection,
        owner: &OwnerId,
        expected_version: u64,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = {
            let mut state = self.state.write().expect("store state poisoned");
            let namespace = (collection, owner.clone());
            let current = state.versions.get(&namespace).copied().unwrap_or(0);
            if current != expected_version {
                return Err(FinanceError::conflict(collection.name(), key));
            }
            if state
                .collections
                .get(&namespace)
                .is_some_and(|entries| entries.contains_key(key))
            {
                return Err(FinanceError::conflict(collection.name(), key));
            }
            let sequence = state.next_sequence();
            state.bump_version(&namespace);
            let document = Document {
                key: key.to_string(),
                owner: owner.clone(),
                version: 1,
                sequence,
                body,
            };
            state
                .collections
                .entry(namespace)
                .or_default()
                .insert(key.to_string(), document.clone());
            document
        };
        self.emit(ChangeEvent {
            collection,
            kind: ChangeKind::Created,
            document: document.clone(),
        });
        Ok(document)
    }

    fn update(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        expected_version: u64,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = {
            let mut state = self.state.write().expect("store state poisoned");
            let namespace = (collection, owner.clone());
            let existing = state
                .collections
                .get(&namespace)
                .and_then(|entries| entries.get(key))
                .cloned()
                .ok_or_else(|| FinanceError::not_found(collection.name(), key))?;
            if existing.version != expected_version {
                return Err(FinanceError::conflict(collection.name(), key));
            }
            state.bump_version(&namespace);
            let document = Document {
                key: existing.key,
                owner: existing.owner,
                version: existing.version + 1,
                sequence: existing.sequence,
                body,
            };
            state
                .collections
                .entry(namespace)
                .or_default()
                .insert(key.to_string(), document.clone());
            document
        };
        self.emit(ChangeEvent {
            collection,
            kind: ChangeKind::Updated,
            document: document.clone(),
        });
        Ok(document)
    }

    fn delete(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<()> {
        let document = {
            let mut state = self.state.write().expect("store state poisoned");
            let namespace = (collection, owner.clone());
            let removed = state
                .collections
                .get_mut(&namespace)
                .and_then(|entries| entries.remove(key))
                .ok_or_else(|| FinanceError::not_found(collection.name(), key))?;
            state.bump_version(&namespace);
            removed
        };
        self.emit(ChangeEvent {
            collection,
            kind: ChangeKind::Deleted,
            document,
        });
        Ok(())
    }

    fn collection_version(&self, collection: Collection, owner: &OwnerId) -> Result<u64> {
        let state = self.state.read().expect("store state poisoned");
        Ok(state
            .versions
            .get(&(collection, owner.clone()))
            .copied()
            .unwrap_or(0))
    }

    fn subscribe(
        &self,
        collection: Collection,
        owner: &OwnerId,
        listener: Listener,
    ) -> Subscription {
        self.listeners.register(collection, owner.clone(), listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = MemoryStore::new();
        let owner = owner();
        let doc = store
            .insert(Collection::Accounts, &owner, "a1", json!({"name": "Checking"}))
            .unwrap();
        assert_eq!(doc.version, 1);
        let fetched = store.get(Collection::Accounts, &owner, "a1").unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let owner = owner();
        store
            .insert(Collection::Alerts, &owner, "k", json!({}))
            .unwrap();
        let err = store
            .insert(Collection::Alerts, &owner, "k", json!({}))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn update_requires_matching_version() {
        let store = MemoryStore::new();
        let owner = owner();
        let doc = store
            .insert(Collection::Cards, &owner, "c1", json!({"balance": 0}))
            .unwrap();
        let updated = store
            .update(Collection::Cards, &owner, "c1", doc.version, json!({"balance": 1}))
            .unwrap();
        assert_eq!(updated.version, 2);
        let err = store
            .update(Collection::Cards, &owner, "c1", doc.version, json!({"balance": 2}))
            .unwrap_err();
        assert!(matches!(err, FinanceError::Conflict { .. }));
    }

    #[test]
    fn insert_cas_detects_concurrent_append() {
        let store = MemoryStore::new();
        let owner = owner();
        let version = store.collection_version(Collection::Balances, &owner).unwrap();
        store
            .insert_cas(Collection::Balances, &owner, version, "b1", json!({"amount": "1"}))
            .unwrap();
        // Stale version: another writer appended since our read.
        let err = store
            .insert_cas(Collection::Balances, &owner, version, "b2", json!({"amount": "2"}))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn owners_are_isolated() {
        let store = MemoryStore::new();
        let alice = OwnerId::new("alice").unwrap();
        let bob = OwnerId::new("bob").unwrap();
        store
            .insert(Collection::Accounts, &alice, "a", json!({}))
            .unwrap();
        assert!(store.list(Collection::Accounts, &bob).unwrap().is_empty());
        assert_eq!(store.list(Collection::Accounts, &alice).unwrap().len(), 1);
    }

    #[test]
    fn sequences_increase_across_collections() {
        let store = MemoryStore::new();
        let owner = owner();
        let first = store
            .insert(Collection::Accounts, &owner, "a", json!({}))
            .unwrap();
        let second = store
            .insert(Collection::Balances, &owner, "b", json!({}))
            .unwrap();
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn subscription_delivers_and_unsubscribes_on_drop() {
        let store = MemoryStore::new();
        let owner = owner();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = store.subscribe(
            Collection::Transactions,
            &owner,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        store
            .insert(Collection::Transactions, &owner, "t1", json!({}))
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        // Different collection does not notify.
        store
            .insert(Collection::Accounts, &owner, "a1", json!({}))
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        drop(subscription);
        store
            .insert(Collection::Transactions, &owner, "t2", json!({}))
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
