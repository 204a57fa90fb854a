//! Column classifier: groups submissions into board columns by status.

use serde::Serialize;
use tracing::debug;

use super::columns::{BoardConfig, ColumnId};
use crate::intake::IntakeSubmission;

/// Submissions grouped per column, in column table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedBoard {
    groups: Vec<(ColumnId, Vec<IntakeSubmission>)>,
    /// Ids of submissions whose status matched no column.
    unplaced: Vec<String>,
}

impl ClassifiedBoard {
    /// Members of `id`, or `None` if the column is not configured.
    pub fn get(&self, id: ColumnId) -> Option<&[IntakeSubmission]> {
        self.groups
            .iter()
            .find(|(column, _)| *column == id)
            .map(|(_, members)| members.as_slice())
    }

    /// Column currently holding the submission with `submission_id`.
    pub fn column_of(&self, submission_id: &str) -> Option<ColumnId> {
        self.groups
            .iter()
            .find(|(_, members)| members.iter().any(|s| s.id == submission_id))
            .map(|(column, _)| *column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &[IntakeSubmission])> {
        self.groups
            .iter()
            .map(|(column, members)| (*column, members.as_slice()))
    }

    pub fn unplaced(&self) -> &[String] {
        &self.unplaced
    }

    /// Number of submissions placed on the board.
    pub fn placed_count(&self) -> usize {
        self.groups.iter().map(|(_, members)| members.len()).sum()
    }
}

/// Group `submissions` by column.
///
/// Every configured column gets an entry, possibly empty. A submission goes
/// to the first column (table order) whose status set contains its
/// lower-cased status. Unmatched submissions are left off the board and
/// listed in [`ClassifiedBoard::unplaced`]. Input order is kept within each
/// column.
pub fn columns_of(config: &BoardConfig, submissions: &[IntakeSubmission]) -> ClassifiedBoard {
    let mut groups: Vec<(ColumnId, Vec<IntakeSubmission>)> = config
        .columns()
        .iter()
        .map(|c| (c.id, Vec::new()))
        .collect();
    let mut unplaced = Vec::new();

    for submission in submissions {
        let token = submission.status_token();
        let slot = config
            .columns()
            .iter()
            .position(|c| c.accepts(&token));
        match slot {
            Some(index) => groups[index].1.push(submission.clone()),
            None => {
                debug!(submission_id = %submission.id, status = %token, "Status matches no column");
                unplaced.push(submission.id.clone());
            }
        }
    }

    ClassifiedBoard { groups, unplaced }
}
