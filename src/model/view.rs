use serde::{Deserialize, Serialize};

use crate::model::record::{Record, Section};

/// A list screen of the desk. Each view shows records in a fixed set of
/// lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Tickets,
    Approvals,
    Jobs,
    History,
}

impl View {
    pub const ALL: [View; 4] = [View::Tickets, View::Approvals, View::Jobs, View::History];

    pub fn sections(self) -> &'static [Section] {
        match self {
            View::Tickets => &[Section::Requested, Section::Approved, Section::InProgress],
            View::Approvals => &[Section::Requested],
            View::Jobs => &[Section::Approved, Section::InProgress],
            View::History => &[Section::Completed, Section::Rejected],
        }
    }

    pub fn accepts(self, section: Section) -> bool {
        self.sections().contains(&section)
    }

    /// Whether users may re-prioritise this view by hand.
    pub fn is_reorderable(self) -> bool {
        matches!(self, View::Tickets | View::Jobs)
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Tickets => write!(f, "tickets"),
            View::Approvals => write!(f, "approvals"),
            View::Jobs => write!(f, "jobs"),
            View::History => write!(f, "history"),
        }
    }
}

impl std::str::FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tickets" => Ok(View::Tickets),
            "approvals" => Ok(View::Approvals),
            "jobs" => Ok(View::Jobs),
            "history" => Ok(View::History),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

/// The (view, department) pair an ordered collection is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewScope {
    pub view: View,
    pub department_id: Option<u64>,
}

impl ViewScope {
    pub fn new(view: View, department_id: Option<u64>) -> Self {
        Self {
            view,
            department_id,
        }
    }

    /// Whether `record` belongs in this scope. A record without a department
    /// is judged by its section alone.
    pub fn contains(&self, record: &Record) -> bool {
        if !self.view.accepts(record.section) {
            return false;
        }
        match (self.department_id, record.department_id) {
            (Some(scope), Some(own)) => scope == own,
            _ => true,
        }
    }
}

impl std::fmt::Display for ViewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.department_id {
            Some(id) => write!(f, "{}@{}", self.view, id),
            None => write!(f, "{}@-", self.view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_partition_known_sections() {
        for section in [
            Section::Approved,
            Section::InProgress,
            Section::Completed,
            Section::Rejected,
        ] {
            let tickets_or_history =
                View::Tickets.accepts(section) || View::History.accepts(section);
            assert!(tickets_or_history, "{} belongs nowhere", section);
        }
        assert!(!View::Jobs.accepts(Section::Requested));
        assert!(!View::Approvals.accepts(Section::InProgress));
        assert!(!View::ALL.iter().any(|v| v.accepts(Section::Unknown)));
    }

    #[test]
    fn scope_checks_department() {
        let scope = ViewScope::new(View::Jobs, Some(3));
        let own = Record::new(1, 1, Section::InProgress).with_department(3);
        let other = Record::new(2, 1, Section::InProgress).with_department(4);
        let unscoped = Record::new(3, 1, Section::InProgress);
        assert!(scope.contains(&own));
        assert!(!scope.contains(&other));
        assert!(scope.contains(&unscoped));
    }

    #[test]
    fn scope_checks_section() {
        let scope = ViewScope::new(View::Jobs, Some(3));
        let done = Record::new(1, 1, Section::Completed).with_department(3);
        assert!(!scope.contains(&done));
        assert!(ViewScope::new(View::History, Some(3)).contains(&done));
    }

    #[test]
    fn view_parses_case_insensitively() {
        assert_eq!("Jobs".parse::<View>().unwrap(), View::Jobs);
        assert!("archive".parse::<View>().is_err());
    }
}
