use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::api::RecordBackend;
use crate::error::Result;
use crate::model::{OrderItem, PriorityChange, Record, RecordId, ViewScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreStatus::Idle => write!(f, "idle"),
            StoreStatus::Loading => write!(f, "loading"),
            StoreStatus::Success => write!(f, "success"),
            StoreStatus::Error => write!(f, "error"),
        }
    }
}

/// What an [`EntityStore::upsert`] did with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// The record left this scope and was dropped from the collection.
    Removed,
    /// The record is out of scope and was never here.
    Ignored,
}

/// Position of a store in its history, used to tell whether async work
/// started earlier still applies.
///
/// `epoch` moves on every reset (logout, department switch); `edits` on
/// every local reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMark {
    pub epoch: u64,
    pub edits: u64,
}

/// Records as they were at one point, for rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    records: Vec<Record>,
    epoch: u64,
}

impl StoreSnapshot {
    /// Reset generation the snapshot was taken in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Ordered records of one view scope plus a load status.
///
/// All mutations are synchronous. The sequence is sorted by ascending
/// priority after every `upsert` and `apply_priorities`; after `reorder` it
/// holds the user's tentative order until the next commit and refetch.
#[derive(Debug)]
pub struct EntityStore {
    scope: ViewScope,
    records: Vec<Record>,
    status: StoreStatus,
    last_error: Option<String>,
    epoch: u64,
    edits: u64,
}

impl EntityStore {
    pub fn new(scope: ViewScope) -> Self {
        Self {
            scope,
            records: Vec::new(),
            status: StoreStatus::Idle,
            last_error: None,
            epoch: 0,
            edits: 0,
        }
    }

    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    /// Point the store at another department. The old collection is dropped.
    pub fn set_scope(&mut self, scope: ViewScope) {
        if self.scope != scope {
            self.scope = scope;
            self.reset();
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status(&self) -> StoreStatus {
        self.status
    }

    pub fn mark(&self) -> StoreMark {
        StoreMark {
            epoch: self.epoch,
            edits: self.edits,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_fetch(&mut self) {
        self.status = StoreStatus::Loading;
    }

    /// Replace the whole collection with the server's order, as given.
    pub fn complete_fetch(&mut self, records: Vec<Record>) {
        self.records = records;
        self.status = StoreStatus::Success;
        self.last_error = None;
    }

    /// Keep the current collection and record why the fetch failed.
    pub fn fail_fetch(&mut self, error: String) {
        self.status = StoreStatus::Error;
        self.last_error = Some(error);
    }

    /// Insert or replace `record`, or drop it if it no longer belongs here.
    pub fn upsert(&mut self, record: Record) -> UpsertOutcome {
        if !self.scope.contains(&record) {
            return if self.remove(record.id) {
                UpsertOutcome::Removed
            } else {
                UpsertOutcome::Ignored
            };
        }

        let outcome = match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                UpsertOutcome::Replaced
            }
            None => {
                self.records.push(record);
                UpsertOutcome::Inserted
            }
        };
        self.sort_by_priority();
        outcome
    }

    /// Drop `id` if present. Returns whether anything was removed.
    pub fn remove(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        before != self.records.len()
    }

    /// Move the record at `from` to `to`. Out-of-range indices change nothing
    /// and return false.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.records.len();
        if from >= len || to >= len {
            return false;
        }
        let record = self.records.remove(from);
        self.records.insert(to, record);
        self.edits += 1;
        true
    }

    /// Apply server-confirmed priorities to the records we hold. Returns how
    /// many records changed.
    pub fn apply_priorities(&mut self, changes: &[PriorityChange]) -> usize {
        let mut applied = 0;
        for change in changes {
            if let Some(record) = self.records.iter_mut().find(|r| r.id == change.id) {
                record.priority = change.priority;
                record.version = change.version.max(record.version);
                applied += 1;
            }
        }
        if applied > 0 {
            self.sort_by_priority();
        }
        applied
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: self.records.clone(),
            epoch: self.epoch,
        }
    }

    /// Put the snapshot's records back. A snapshot taken before the last
    /// reset is refused: it belongs to a session or scope that is gone.
    pub fn restore(&mut self, snapshot: StoreSnapshot) -> bool {
        if snapshot.epoch != self.epoch {
            return false;
        }
        self.records = snapshot.records;
        true
    }

    /// Back to empty and idle, as after logout. Work started before the
    /// reset can no longer write into the store.
    pub fn reset(&mut self) {
        self.records.clear();
        self.status = StoreStatus::Idle;
        self.last_error = None;
        self.epoch += 1;
    }

    fn sort_by_priority(&mut self) {
        // Stable: equal priorities keep their relative order.
        self.records.sort_by_key(|r| r.priority);
    }
}

/// Shared handle to an [`EntityStore`]. Clones refer to the same store.
///
/// Every mutation bumps a revision counter that views can watch to know
/// when to re-read.
#[derive(Debug, Clone)]
pub struct ViewStore {
    inner: Arc<RwLock<EntityStore>>,
    revision: Arc<watch::Sender<u64>>,
}

impl ViewStore {
    pub fn new(scope: ViewScope) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(EntityStore::new(scope))),
            revision: Arc::new(revision),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub async fn scope(&self) -> ViewScope {
        self.inner.read().await.scope()
    }

    pub async fn set_department(&self, department_id: Option<u64>) {
        let mut store = self.inner.write().await;
        let scope = ViewScope::new(store.scope().view, department_id);
        store.set_scope(scope);
        drop(store);
        self.bump();
    }

    pub async fn records(&self) -> Vec<Record> {
        self.inner.read().await.records().to_vec()
    }

    pub async fn mark(&self) -> StoreMark {
        self.inner.read().await.mark()
    }

    /// Scope, current order and mark, read under one lock.
    pub async fn order_for_commit(&self) -> (ViewScope, Vec<OrderItem>, StoreMark) {
        let store = self.inner.read().await;
        let items = store.records().iter().map(Record::order_item).collect();
        (store.scope(), items, store.mark())
    }

    pub async fn ids(&self) -> Vec<RecordId> {
        self.inner.read().await.ids()
    }

    pub async fn status(&self) -> StoreStatus {
        self.inner.read().await.status()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.read().await.last_error().map(str::to_string)
    }

    /// Load the scope from `backend` and replace the collection.
    ///
    /// Calls are neither deduplicated nor fenced against each other: when
    /// two fetches overlap, whichever response resolves last is what the
    /// store keeps. A response that arrives after a reset is dropped, so a
    /// logged-out store stays empty and idle.
    pub async fn fetch(&self, backend: &dyn RecordBackend) -> Result<usize> {
        self.load(backend, None).await
    }

    /// Refetch after a committed reorder. The response is also dropped when
    /// the user reordered again since `since`; the next commit refetches.
    pub async fn refetch_unless_edited(
        &self,
        backend: &dyn RecordBackend,
        since: StoreMark,
    ) -> Result<usize> {
        self.load(backend, Some(since)).await
    }

    async fn load(&self, backend: &dyn RecordBackend, since: Option<StoreMark>) -> Result<usize> {
        let (scope, started) = {
            let mut store = self.inner.write().await;
            if since.is_none() {
                store.begin_fetch();
            }
            (store.scope(), since.unwrap_or_else(|| store.mark()))
        };
        self.bump();

        let result = backend.list_records(&scope).await;

        let mut store = self.inner.write().await;
        let current = store.mark();
        let stale = current.epoch != started.epoch
            || (since.is_some() && current.edits != started.edits);
        if stale {
            tracing::debug!(scope = %scope, "Store changed while fetching, response dropped");
            return result.map(|_| 0);
        }

        let outcome = match result {
            Ok(records) => {
                let count = records.len();
                store.complete_fetch(records);
                tracing::debug!(scope = %scope, count, "Store fetched");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "Store fetch failed");
                store.fail_fetch(e.to_string());
                Err(e)
            }
        };
        drop(store);
        self.bump();
        outcome
    }

    pub async fn upsert(&self, record: Record) -> UpsertOutcome {
        let outcome = self.inner.write().await.upsert(record);
        if outcome != UpsertOutcome::Ignored {
            self.bump();
        }
        outcome
    }

    pub async fn remove(&self, id: RecordId) -> bool {
        let removed = self.inner.write().await.remove(id);
        if removed {
            self.bump();
        }
        removed
    }

    pub async fn reorder(&self, from: usize, to: usize) -> bool {
        let moved = self.inner.write().await.reorder(from, to);
        if moved {
            self.bump();
        }
        moved
    }

    /// Reorder and hand back the collection as it was just before the move,
    /// taken under the same lock. `None` when the indices were out of range.
    pub async fn reorder_with_snapshot(&self, from: usize, to: usize) -> Option<StoreSnapshot> {
        let mut store = self.inner.write().await;
        let before = store.snapshot();
        if !store.reorder(from, to) {
            return None;
        }
        drop(store);
        self.bump();
        Some(before)
    }

    pub async fn apply_priorities(&self, changes: &[PriorityChange]) -> usize {
        let applied = self.inner.write().await.apply_priorities(changes);
        if applied > 0 {
            self.bump();
        }
        applied
    }

    /// See [`EntityStore::restore`]. Returns whether the records went back.
    pub async fn restore(&self, snapshot: StoreSnapshot) -> bool {
        let restored = self.inner.write().await.restore(snapshot);
        if restored {
            self.bump();
        }
        restored
    }

    pub async fn reset(&self) {
        self.inner.write().await.reset();
        self.bump();
    }
}
