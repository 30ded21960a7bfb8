use async_trait::async_trait;

use crate::api::RecordBackend;
use crate::auth::SessionListener;
use crate::model::{View, ViewScope};
use crate::store::entity::ViewStore;

/// The four view stores of a desk session.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    tickets: ViewStore,
    approvals: ViewStore,
    jobs: ViewStore,
    history: ViewStore,
}

impl StoreRegistry {
    pub fn new(department_id: Option<u64>) -> Self {
        Self {
            tickets: ViewStore::new(ViewScope::new(View::Tickets, department_id)),
            approvals: ViewStore::new(ViewScope::new(View::Approvals, department_id)),
            jobs: ViewStore::new(ViewScope::new(View::Jobs, department_id)),
            history: ViewStore::new(ViewScope::new(View::History, department_id)),
        }
    }

    pub fn get(&self, view: View) -> &ViewStore {
        match view {
            View::Tickets => &self.tickets,
            View::Approvals => &self.approvals,
            View::Jobs => &self.jobs,
            View::History => &self.history,
        }
    }

    pub fn tickets(&self) -> &ViewStore {
        &self.tickets
    }

    pub fn approvals(&self) -> &ViewStore {
        &self.approvals
    }

    pub fn jobs(&self) -> &ViewStore {
        &self.jobs
    }

    pub fn history(&self) -> &ViewStore {
        &self.history
    }

    pub fn all(&self) -> impl Iterator<Item = (View, &ViewStore)> + '_ {
        View::ALL.into_iter().map(move |view| (view, self.get(view)))
    }

    pub async fn set_department(&self, department_id: Option<u64>) {
        for (_, store) in self.all() {
            store.set_department(department_id).await;
        }
    }

    /// Fetch every view. One failing view does not stop the others; the
    /// number of views that loaded is returned.
    pub async fn fetch_all(&self, backend: &dyn RecordBackend) -> usize {
        let mut loaded = 0;
        for (view, store) in self.all() {
            match store.fetch(backend).await {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(view = %view, error = %e, "Initial fetch failed"),
            }
        }
        loaded
    }

    pub async fn reset_all(&self) {
        for (_, store) in self.all() {
            store.reset().await;
        }
        tracing::debug!("All stores reset");
    }
}

#[async_trait]
impl SessionListener for StoreRegistry {
    async fn on_logout(&self) {
        self.reset_all().await;
    }
}
