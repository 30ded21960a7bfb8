use std::sync::Arc;

use tokio::sync::watch;

use crate::api::RecordBackend;
use crate::model::{PriorityChange, RealtimeEvent, Record, Section};
use crate::notify::Notifier;
use crate::store::{StoreRegistry, StoreStatus, UpsertOutcome};

/// Routes realtime events into the view stores.
///
/// One business event can concern several views at once. Each store applies
/// it on its own terms: a record that still belongs to the store's scope is
/// upserted, one that left is removed. Stores are updated one after another;
/// there is no atomicity across them.
pub struct EventDispatcher {
    stores: StoreRegistry,
    backend: Arc<dyn RecordBackend>,
    notifier: Notifier,
    edit_mode: watch::Sender<bool>,
}

impl EventDispatcher {
    pub fn new(stores: StoreRegistry, backend: Arc<dyn RecordBackend>, notifier: Notifier) -> Self {
        let (edit_mode, _rx) = watch::channel(false);
        Self {
            stores,
            backend,
            notifier,
            edit_mode,
        }
    }

    /// Whether the server currently has the system in edit mode.
    pub fn edit_mode(&self) -> watch::Receiver<bool> {
        self.edit_mode.subscribe()
    }

    /// Apply `event` and return how many stores it changed or refetched.
    pub async fn dispatch(&self, event: RealtimeEvent) -> usize {
        tracing::debug!(kind = event.kind(), "Dispatching realtime event");
        match event {
            RealtimeEvent::ConnectionEstablished { client_id } => {
                tracing::info!(client_id = ?client_id, "Realtime connection established");
                0
            }
            RealtimeEvent::SystemEditModeChanged { enabled } => {
                self.edit_mode.send_replace(enabled);
                if enabled {
                    self.notifier
                        .info("The system is in edit mode. Changes may be restricted.");
                } else {
                    self.notifier.info("Edit mode has ended.");
                }
                0
            }
            RealtimeEvent::RecordCreated(record) | RealtimeEvent::RecordUpdated(record) => {
                self.merge_record(record).await
            }
            RealtimeEvent::RecordPriorityUpdated { changes } => {
                self.merge_priorities(&changes).await
            }
            RealtimeEvent::RecordPriorityRecalculated {
                department_id,
                section,
            } => self.refetch_department(department_id, section).await,
            RealtimeEvent::Unknown { kind } => {
                tracing::warn!(kind = %kind, "Unknown realtime event ignored");
                0
            }
        }
    }

    async fn merge_record(&self, record: Record) -> usize {
        let mut touched = 0;
        for (view, store) in self.stores.all() {
            let outcome = store.upsert(record.clone()).await;
            if outcome != UpsertOutcome::Ignored {
                tracing::debug!(view = %view, record_id = record.id, outcome = ?outcome, "Record merged");
                touched += 1;
            }
        }
        touched
    }

    async fn merge_priorities(&self, changes: &[PriorityChange]) -> usize {
        let mut touched = 0;
        for (_, store) in self.stores.all() {
            if store.apply_priorities(changes).await > 0 {
                touched += 1;
            }
        }
        touched
    }

    /// The server re-ranked a department. Refetch every loaded store showing
    /// it; a failed refetch leaves that store as it was.
    async fn refetch_department(&self, department_id: u64, section: Option<Section>) -> usize {
        let mut refetched = 0;
        for (view, store) in self.stores.all() {
            let scope = store.scope().await;
            if scope.department_id != Some(department_id) {
                continue;
            }
            if let Some(section) = section {
                if !view.accepts(section) {
                    continue;
                }
            }
            if store.status().await == StoreStatus::Idle {
                continue;
            }
            match store.fetch(self.backend.as_ref()).await {
                Ok(_) => refetched += 1,
                Err(e) => {
                    tracing::warn!(view = %view, department_id, error = %e, "Refetch after recalculation failed")
                }
            }
        }
        refetched
    }
}
