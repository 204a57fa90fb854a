//! Triage board column configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of a triage-board stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnId {
    Pending,
    Reviewing,
    Scheduling,
    Scheduled,
    Archived,
}

impl ColumnId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Scheduling => "scheduling",
            Self::Scheduled => "scheduled",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ColumnId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewing" => Ok(Self::Reviewing),
            "scheduling" => Ok(Self::Scheduling),
            "scheduled" => Ok(Self::Scheduled),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown column: {}", s)),
        }
    }
}

/// One stage on the board and the status tokens it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub color: String,
    /// Lower-case status tokens belonging to this column.
    pub statuses: Vec<String>,
}

impl Column {
    pub fn new(id: ColumnId, title: &str, color: &str, statuses: &[&str]) -> Self {
        Self {
            id,
            title: title.to_string(),
            color: color.to_string(),
            statuses: statuses.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Whether `token` (compared lower-cased) belongs to this column.
    pub fn accepts(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.statuses.iter().any(|s| *s == token)
    }
}

/// Immutable board configuration: the column table plus the status each
/// column requests when a card is dropped into it.
///
/// Column order matters. When status sets overlap, the first listed column
/// claims the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    columns: Vec<Column>,
    requested_status: HashMap<ColumnId, String>,
}

impl BoardConfig {
    /// Build a config. Columns without an entry in `requested_status` accept
    /// drops visually but never produce a transition.
    pub fn new(columns: Vec<Column>, requested_status: HashMap<ColumnId, String>) -> Self {
        Self {
            columns,
            requested_status,
        }
    }

    /// Columns in table order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// First column (in table order) that accepts `status`.
    pub fn column_for(&self, status: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.accepts(status))
    }

    /// Status token to request when a card lands in `id`.
    pub fn requested_status(&self, id: ColumnId) -> Option<&str> {
        self.requested_status.get(&id).map(String::as_str)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        let columns = vec![
            Column::new(ColumnId::Pending, "New", "#3b82f6", &["pending"]),
            Column::new(
                ColumnId::Reviewing,
                "Triaged",
                "#8b5cf6",
                &["reviewing", "triaged"],
            ),
            Column::new(ColumnId::Scheduling, "Scheduling", "#f59e0b", &["scheduling"]),
            Column::new(
                ColumnId::Scheduled,
                "Scheduled",
                "#10b981",
                &["scheduled", "approved"],
            ),
            Column::new(
                ColumnId::Archived,
                "Archived",
                "#6b7280",
                &["archived", "rejected"],
            ),
        ];
        let requested_status = columns
            .iter()
            .map(|c| (c.id, c.id.as_str().to_string()))
            .collect();
        Self::new(columns, requested_status)
    }
}
