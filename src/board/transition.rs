//! Transition resolver: turns a drag-and-drop gesture into a status request.
//!
//! The resolver never touches the network and never mutates submissions. It
//! answers one question: given where a card was dropped, which status (if
//! any) should be requested for it?

use serde::{Deserialize, Serialize};

use super::classifier::columns_of;
use super::columns::{BoardConfig, Column, ColumnId};
use crate::intake::IntakeSubmission;

/// The end of a drag: which card moved and what it was dropped on.
///
/// `over_id` may name a column or another card; `None` means the card was
/// released outside any drop target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragInteraction {
    pub active_id: String,
    #[serde(default)]
    pub over_id: Option<String>,
}

impl DragInteraction {
    pub fn new(active_id: impl Into<String>, over_id: Option<impl Into<String>>) -> Self {
        Self {
            active_id: active_id.into(),
            over_id: over_id.map(Into::into),
        }
    }
}

/// A status change to request from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub submission_id: String,
    pub new_status: String,
}

impl Transition {
    /// Body for the status-update endpoint.
    pub fn into_request(self, notes: Option<String>) -> StatusUpdateRequest {
        StatusUpdateRequest {
            status: self.new_status,
            notes,
        }
    }
}

/// Body of `PATCH /api/evaluations/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Work out which status, if any, a drop should request.
///
/// Returns `None` when the active card is unknown, the drop has no target,
/// the target cannot be resolved, the card is already in the target stage,
/// or the target column has no requested status. A direct column match on
/// `over_id` takes priority over a card with the same id.
pub fn resolve_transition(
    config: &BoardConfig,
    submissions: &[IntakeSubmission],
    drag: &DragInteraction,
) -> Option<Transition> {
    let active = submissions.iter().find(|s| s.id == drag.active_id)?;
    let over_id = drag.over_id.as_deref()?;

    let target = target_column(config, submissions, over_id)?;

    if target.accepts(&active.status_token()) {
        return None;
    }

    let new_status = config.requested_status(target.id)?;
    Some(Transition {
        submission_id: drag.active_id.clone(),
        new_status: new_status.to_string(),
    })
}

fn target_column<'a>(
    config: &'a BoardConfig,
    submissions: &[IntakeSubmission],
    over_id: &str,
) -> Option<&'a Column> {
    if let Some(column) = over_id
        .parse::<ColumnId>()
        .ok()
        .and_then(|id| config.column(id))
    {
        return Some(column);
    }

    let board = columns_of(config, submissions);
    board
        .column_of(over_id)
        .and_then(|id| config.column(id))
}
