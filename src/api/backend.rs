use async_trait::async_trait;

use crate::error::Result;
use crate::model::{OrderItem, Record, ViewScope};

/// What the stores and the reorder coordinator need from the server.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Authoritative, priority-ordered contents of `scope`.
    async fn list_records(&self, scope: &ViewScope) -> Result<Vec<Record>>;

    /// Replace the order of `scope` with `items`, first item highest priority.
    /// Fails with a conflict when any version is stale.
    async fn commit_order(&self, scope: &ViewScope, items: &[OrderItem]) -> Result<()>;
}

/// Issues the one-time credential the realtime channel connects with.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn issue_realtime_ticket(&self) -> Result<String>;
}
