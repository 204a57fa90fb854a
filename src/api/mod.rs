//! Evaluations backend: the `EvaluationApi` trait and the fetch/update policy.
//!
//! List fetches degrade to an empty page on any failure so the board can
//! render an empty state. Detail fetches and status updates propagate their
//! errors so the caller can show them.

pub mod client;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub use client::EvaluationClient;

use crate::board::transition::{StatusUpdateRequest, Transition};
use crate::error::{ApiError, Result};
use crate::intake::{IntakeDetails, IntakeFilters, IntakePage, normalize_details, normalize_payload};

/// Raw access to the evaluations endpoints.
#[async_trait]
pub trait EvaluationApi: Send + Sync {
    /// `GET /api/evaluations` with the given filters, as raw JSON.
    async fn list_evaluations(&self, filters: &IntakeFilters) -> std::result::Result<Value, ApiError>;

    /// `GET /api/evaluations/{id}`, as raw JSON.
    async fn get_evaluation(&self, id: &str) -> std::result::Result<Value, ApiError>;

    /// `PATCH /api/evaluations/{id}/status`.
    async fn update_status(
        &self,
        id: &str,
        request: &StatusUpdateRequest,
    ) -> std::result::Result<(), ApiError>;
}

/// Fetch and normalize the intake list. Never fails.
pub async fn fetch_intakes(api: &dyn EvaluationApi, filters: &IntakeFilters) -> IntakePage {
    let payload = match api.list_evaluations(filters).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to fetch evaluations; showing empty board");
            return IntakePage::empty();
        }
    };
    match normalize_payload(payload) {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Evaluation list had an unreadable shape; showing empty board");
            IntakePage::empty()
        }
    }
}

/// Fetch and normalize one intake in full.
pub async fn fetch_intake_details(api: &dyn EvaluationApi, id: &str) -> Result<IntakeDetails> {
    let payload = api.get_evaluation(id).await?;
    Ok(normalize_details(payload)?)
}

/// Send a resolved transition to the backend.
pub async fn apply_transition(
    api: &dyn EvaluationApi,
    transition: &Transition,
    notes: Option<String>,
) -> std::result::Result<(), ApiError> {
    let request = transition.clone().into_request(notes);
    api.update_status(&transition.submission_id, &request).await?;
    info!(
        submission_id = %transition.submission_id,
        status = %transition.new_status,
        "Status update persisted"
    );
    Ok(())
}
