use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::backend::{RecordBackend, TicketSource};
use crate::api::gateway::ApiGateway;
use crate::api::transport::ApiRequest;
use crate::error::{DeskError, Result};
use crate::model::{
    Department, Employee, Location, OrderItem, Record, RecordId, Section, View, ViewScope,
};

/// Fields for a new ticket.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub department_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<u64>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DeskError::Validation("title is required".to_string()));
        }
        if self.department_id.is_none() {
            return Err(DeskError::Validation("department is required".to_string()));
        }
        Ok(())
    }
}

/// Partial update of a ticket. `version` is the one the caller last saw.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<u64>,
}

impl TicketUpdate {
    pub fn validate(&self) -> Result<()> {
        match self.title {
            Some(ref title) if title.trim().is_empty() => {
                Err(DeskError::Validation("title cannot be blank".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject { reason: String },
}

#[derive(Deserialize)]
struct RealtimeTicket {
    ticket: String,
}

/// Typed wrappers over the desk's REST endpoints.
pub struct DeskApi {
    gateway: Arc<ApiGateway>,
}

impl DeskApi {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    fn list_path(view: View) -> &'static str {
        match view {
            View::Tickets => "/tickets",
            View::Approvals => "/tickets/approvals",
            View::Jobs => "/jobs",
            View::History => "/tickets/history",
        }
    }

    fn reorder_path(view: View) -> Result<&'static str> {
        match view {
            View::Tickets => Ok("/tickets/reorder"),
            View::Jobs => Ok("/jobs/reorder"),
            other => Err(DeskError::Validation(format!(
                "{} view cannot be reordered",
                other
            ))),
        }
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Record> {
        ticket.validate()?;
        let request = ApiRequest::post("/tickets").with_json(serde_json::to_value(ticket)?);
        let record: Record = self.gateway.fetch(request).await?;
        tracing::info!(ticket_id = record.id, "Ticket created");
        Ok(record)
    }

    pub async fn update_ticket(&self, id: RecordId, update: &TicketUpdate) -> Result<Record> {
        update.validate()?;
        let request =
            ApiRequest::put(format!("/tickets/{}", id)).with_json(serde_json::to_value(update)?);
        self.gateway.fetch(request).await
    }

    pub async fn delete_ticket(&self, id: RecordId) -> Result<()> {
        self.gateway
            .execute(ApiRequest::delete(format!("/tickets/{}", id)))
            .await
    }

    pub async fn decide_approval(
        &self,
        id: RecordId,
        version: u64,
        decision: &ApprovalDecision,
    ) -> Result<Record> {
        let body = match decision {
            ApprovalDecision::Approve => json!({ "decision": "approve", "version": version }),
            ApprovalDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(DeskError::Validation(
                        "a rejection needs a reason".to_string(),
                    ));
                }
                json!({ "decision": "reject", "reason": reason, "version": version })
            }
        };
        let request = ApiRequest::post(format!("/tickets/{}/approval", id)).with_json(body);
        self.gateway.fetch(request).await
    }

    pub async fn assign_job(&self, id: RecordId, version: u64, employee_id: u64) -> Result<Record> {
        let request = ApiRequest::post(format!("/jobs/{}/assign", id))
            .with_json(json!({ "employeeId": employee_id, "version": version }));
        self.gateway.fetch(request).await
    }

    pub async fn update_job_section(
        &self,
        id: RecordId,
        version: u64,
        section: Section,
    ) -> Result<Record> {
        if section == Section::Unknown {
            return Err(DeskError::Validation("unknown section".to_string()));
        }
        let request = ApiRequest::put(format!("/jobs/{}/section", id))
            .with_json(json!({ "section": section, "version": version }));
        self.gateway.fetch(request).await
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        self.gateway.fetch(ApiRequest::get("/departments")).await
    }

    pub async fn list_employees(&self, department_id: Option<u64>) -> Result<Vec<Employee>> {
        let mut request = ApiRequest::get("/employees");
        if let Some(id) = department_id {
            request = request.with_query("departmentId", id);
        }
        self.gateway.fetch(request).await
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.gateway.fetch(ApiRequest::get("/locations")).await
    }
}

#[async_trait]
impl RecordBackend for DeskApi {
    async fn list_records(&self, scope: &ViewScope) -> Result<Vec<Record>> {
        let mut request = ApiRequest::get(Self::list_path(scope.view));
        if let Some(id) = scope.department_id {
            request = request.with_query("departmentId", id);
        }
        self.gateway.fetch(request).await
    }

    async fn commit_order(&self, scope: &ViewScope, items: &[OrderItem]) -> Result<()> {
        let path = Self::reorder_path(scope.view)?;
        let scope_id = scope.department_id.ok_or_else(|| {
            DeskError::Validation("reorder needs a department scope".to_string())
        })?;
        let request = ApiRequest::post(path).with_json(json!({
            "scopeId": scope_id,
            "items": items,
        }));
        self.gateway.execute(request).await
    }
}

#[async_trait]
impl TicketSource for DeskApi {
    /// Authenticated ticket when logged in, anonymous one otherwise.
    async fn issue_realtime_ticket(&self) -> Result<String> {
        let request = if self.gateway.sessions().is_authenticated().await {
            ApiRequest::post("/auth/ws-ticket")
        } else {
            ApiRequest::post("/auth/ws-ticket/public").public()
        };
        let issued: RealtimeTicket = self.gateway.fetch(request).await?;
        Ok(issued.ticket)
    }
}
