mod test_harness;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use jobdesk::auth::SessionListener;
use jobdesk::model::{Record, Section, View, ViewScope};
use jobdesk::store::{EntityStore, StoreRegistry, StoreStatus, UpsertOutcome, ViewStore};
use test_harness::{job, requested, FakeBackend, DEPARTMENT};

fn jobs_scope() -> ViewScope {
    ViewScope::new(View::Jobs, Some(DEPARTMENT))
}

fn assert_sorted_and_unique(store: &EntityStore) {
    let ids = store.ids();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate ids in {:?}", ids);

    let priorities: Vec<i64> = store.records().iter().map(|r| r.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted, "store not sorted by priority");
}

#[test]
fn test_upsert_sequence_keeps_ids_unique_and_sorted() {
    let mut store = EntityStore::new(jobs_scope());

    // Deterministic mix of inserts, replacements and section changes.
    let mut seed: u64 = 0x5eed;
    for step in 0..200 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let id = (seed >> 33) % 12;
        let priority = ((seed >> 17) % 50) as i64;
        let section = match step % 7 {
            0 => Section::Completed,
            1 => Section::Approved,
            _ => Section::InProgress,
        };
        store.upsert(Record::new(id, priority, section).with_department(DEPARTMENT));
        assert_sorted_and_unique(&store);
    }

    // Only records that still belong to the jobs view remain.
    assert!(store
        .records()
        .iter()
        .all(|r| matches!(r.section, Section::Approved | Section::InProgress)));
}

#[test]
fn test_upsert_of_foreign_department_is_ignored() {
    let mut store = EntityStore::new(jobs_scope());
    store.upsert(job(1, 1));

    let foreign = job(2, 1).with_department(DEPARTMENT + 1);
    assert_eq!(store.upsert(foreign), UpsertOutcome::Ignored);
    assert_eq!(store.ids(), vec![1]);
}

#[test]
fn test_record_moving_to_other_department_is_removed() {
    let mut store = EntityStore::new(jobs_scope());
    store.upsert(job(1, 1));
    store.upsert(job(2, 2));

    let moved = job(1, 1).with_department(DEPARTMENT + 1);
    assert_eq!(store.upsert(moved), UpsertOutcome::Removed);
    assert_eq!(store.ids(), vec![2]);
}

#[test]
fn test_reorder_then_inverse_restores_order() {
    let mut store = EntityStore::new(jobs_scope());
    for id in 1..=5 {
        store.upsert(job(id, id as i64));
    }
    let original = store.ids();

    for (from, to) in [(0, 4), (4, 0), (1, 3), (2, 2), (3, 1)] {
        assert!(store.reorder(from, to));
        assert!(store.reorder(to, from));
        assert_eq!(store.ids(), original, "move {}->{} not undone", from, to);
    }
}

#[test]
fn test_reorder_out_of_range_leaves_store_alone() {
    let mut store = EntityStore::new(jobs_scope());
    store.upsert(job(1, 1));
    store.upsert(job(2, 2));

    assert!(!store.reorder(0, 2));
    assert!(!store.reorder(5, 0));
    assert_eq!(store.ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_fetch_replaces_collection_with_server_order() {
    let backend = FakeBackend::with_records(vec![job(1, 3), job(2, 1), job(3, 2), requested(4, 1)]);
    let store = ViewStore::new(jobs_scope());
    store.upsert(job(99, 0)).await;

    let count = store.fetch(backend.as_ref()).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(store.ids().await, vec![2, 3, 1]);
    assert_eq!(store.status().await, StoreStatus::Success);
    assert!(store.last_error().await.is_none());
}

#[tokio::test]
async fn test_failed_fetch_keeps_records_and_reports_error() {
    let backend = FakeBackend::with_records(vec![job(1, 1), job(2, 2)]);
    let store = ViewStore::new(jobs_scope());
    store.fetch(backend.as_ref()).await.unwrap();

    backend.fail_list.store(true, Ordering::SeqCst);
    assert!(store.fetch(backend.as_ref()).await.is_err());

    assert_eq!(store.ids().await, vec![1, 2]);
    assert_eq!(store.status().await, StoreStatus::Error);
    assert!(store.last_error().await.unwrap().contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_resolving_after_reset_is_dropped() {
    let backend = FakeBackend::with_records(vec![job(1, 1), job(2, 2)]);
    backend.list_delay_ms.store(100, Ordering::SeqCst);
    let store = ViewStore::new(jobs_scope());

    let (fetched, _) = tokio::join!(store.fetch(backend.as_ref()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.reset().await;
    });

    assert_eq!(fetched.unwrap(), 0);
    assert!(store.ids().await.is_empty());
    assert_eq!(store.status().await, StoreStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failing_after_reset_leaves_store_idle() {
    let backend = FakeBackend::with_records(vec![job(1, 1)]);
    backend.fail_list.store(true, Ordering::SeqCst);
    backend.list_delay_ms.store(100, Ordering::SeqCst);
    let store = ViewStore::new(jobs_scope());

    let (fetched, _) = tokio::join!(store.fetch(backend.as_ref()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.reset().await;
    });

    assert!(fetched.is_err());
    assert_eq!(store.status().await, StoreStatus::Idle);
    assert!(store.last_error().await.is_none());
}

#[tokio::test]
async fn test_refetch_after_commit_yields_to_newer_moves() {
    let backend = FakeBackend::with_records(vec![job(1, 1), job(2, 2), job(3, 3)]);
    let store = ViewStore::new(jobs_scope());
    store.fetch(backend.as_ref()).await.unwrap();

    let committed = store.mark().await;
    assert!(store.reorder(0, 2).await);

    let applied = store
        .refetch_unless_edited(backend.as_ref(), committed)
        .await
        .unwrap();
    assert_eq!(applied, 0);
    assert_eq!(store.ids().await, vec![2, 3, 1]);
    assert_eq!(store.status().await, StoreStatus::Success);

    let current = store.mark().await;
    let applied = store
        .refetch_unless_edited(backend.as_ref(), current)
        .await
        .unwrap();
    assert_eq!(applied, 3);
    assert_eq!(store.ids().await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_store_change_notifies_subscribers() {
    let store = ViewStore::new(jobs_scope());
    let mut revision = store.subscribe();
    let before = *revision.borrow_and_update();

    store.upsert(job(1, 1)).await;

    assert!(revision.has_changed().unwrap());
    assert!(*revision.borrow_and_update() > before);

    // Nothing changes, nothing published.
    store.upsert(job(2, 1).with_department(DEPARTMENT + 1)).await;
    assert!(!revision.has_changed().unwrap());
}

#[tokio::test]
async fn test_registry_fetch_all_loads_each_view() {
    let backend = FakeBackend::with_records(vec![
        requested(1, 1),
        job(2, 1),
        Record::new(3, 1, Section::Completed).with_department(DEPARTMENT),
    ]);
    let registry = StoreRegistry::new(Some(DEPARTMENT));

    let loaded = registry.fetch_all(backend.as_ref()).await;

    assert_eq!(loaded, 4);
    assert_eq!(registry.tickets().ids().await, vec![1, 2]);
    assert_eq!(registry.approvals().ids().await, vec![1]);
    assert_eq!(registry.jobs().ids().await, vec![2]);
    assert_eq!(registry.history().ids().await, vec![3]);
}

#[tokio::test]
async fn test_switching_department_drops_old_records() {
    let backend = FakeBackend::with_records(vec![job(1, 1)]);
    let registry = StoreRegistry::new(Some(DEPARTMENT));
    registry.fetch_all(backend.as_ref()).await;
    assert_eq!(registry.jobs().ids().await, vec![1]);

    registry.set_department(Some(DEPARTMENT + 1)).await;

    assert!(registry.jobs().ids().await.is_empty());
    assert_eq!(registry.jobs().status().await, StoreStatus::Idle);
    assert_eq!(
        registry.jobs().scope().await,
        ViewScope::new(View::Jobs, Some(DEPARTMENT + 1))
    );
}

#[tokio::test]
async fn test_logout_resets_every_store() {
    let backend = FakeBackend::with_records(vec![requested(1, 1), job(2, 1)]);
    let registry = StoreRegistry::new(Some(DEPARTMENT));
    registry.fetch_all(backend.as_ref()).await;

    registry.on_logout().await;

    for (view, store) in registry.all() {
        assert!(store.ids().await.is_empty(), "{} not cleared", view);
        assert_eq!(store.status().await, StoreStatus::Idle);
    }
}
