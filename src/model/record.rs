use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RecordId = u64;

/// Lifecycle phase of a ticket or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Requested,
    Approved,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Rejected,
    /// Any phase this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Requested => write!(f, "Requested"),
            Section::Approved => write!(f, "Approved"),
            Section::InProgress => write!(f, "In Progress"),
            Section::Completed => write!(f, "Completed"),
            Section::Rejected => write!(f, "Rejected"),
            Section::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A ticket or job as the server returns it.
///
/// Only `id`, `priority`, `version` and `section` take part in ordering and
/// reconciliation; the remaining fields are carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    /// Rank within a (department, section) scope. Lower sorts first.
    pub priority: i64,
    /// Optimistic-concurrency token, bumped by the server on every mutation.
    #[serde(default)]
    pub version: u64,
    pub section: Section,
    #[serde(default)]
    pub department_id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub location_id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(id: RecordId, priority: i64, section: Section) -> Self {
        Self {
            id,
            priority,
            version: 0,
            section,
            department_id: None,
            title: String::new(),
            description: None,
            assignee_id: None,
            location_id: None,
            created_at: None,
        }
    }

    pub fn with_department(mut self, department_id: u64) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn order_item(&self) -> OrderItem {
        OrderItem {
            id: self.id,
            version: self.version,
        }
    }
}

/// One entry of a bulk "commit order" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: RecordId,
    pub version: u64,
}

/// Server-confirmed priority for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChange {
    pub id: RecordId,
    pub priority: i64,
    #[serde(default)]
    pub version: u64,
}
