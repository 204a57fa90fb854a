//! Triage board: latest classified snapshot with broadcast to dashboard clients.
//!
//! The board never changes a submission locally. A successful drag sends the
//! status update, then re-fetches and re-classifies the whole list; the new
//! snapshot is what clients see.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use super::classifier::{ClassifiedBoard, columns_of};
use super::columns::{BoardConfig, ColumnId};
use super::transition::{DragInteraction, Transition, resolve_transition};
use crate::api::{self, EvaluationApi};
use crate::error::ApiError;
use crate::intake::{IntakeFilters, IntakeStats, IntakeSubmission};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// One column as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnView {
    pub id: ColumnId,
    pub title: String,
    pub color: String,
    pub count: usize,
    pub intakes: Vec<IntakeSubmission>,
}

/// Everything a dashboard needs to draw the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub columns: Vec<ColumnView>,
    /// Server-side total from the list endpoint.
    pub total: usize,
    pub stats: IntakeStats,
    /// Submissions whose status has no column.
    pub unplaced: Vec<String>,
    /// `None` until the first refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BoardSnapshot {
    fn build(
        config: &BoardConfig,
        board: &ClassifiedBoard,
        submissions: &[IntakeSubmission],
        total: usize,
        refreshed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let columns = config
            .columns()
            .iter()
            .map(|column| {
                let intakes = board.get(column.id).unwrap_or_default().to_vec();
                ColumnView {
                    id: column.id,
                    title: column.title.clone(),
                    color: column.color.clone(),
                    count: intakes.len(),
                    intakes,
                }
            })
            .collect();
        let today = refreshed_at.unwrap_or_else(Utc::now).date_naive();
        Self {
            columns,
            total,
            stats: IntakeStats::compute(submissions, today),
            unplaced: board.unplaced().to_vec(),
            refreshed_at,
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    /// Full board after a refresh (also sent on connect).
    BoardSync { board: BoardSnapshot },
    /// A status change was persisted by the backend.
    TransitionApplied { transition: Transition },
    /// The backend rejected a status change.
    TransitionFailed { submission_id: String, error: String },
}

/// Result of handling a drag-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragOutcome {
    /// The status change was persisted and the board refreshed.
    Applied { transition: Transition },
    /// Nothing to do (same stage, unknown card or target).
    NoOp,
}

struct BoardState {
    submissions: Vec<IntakeSubmission>,
    snapshot: BoardSnapshot,
}

/// Shared triage board.
pub struct TriageBoard {
    api: Arc<dyn EvaluationApi>,
    config: BoardConfig,
    filters: RwLock<IntakeFilters>,
    state: RwLock<BoardState>,
    /// Held from fetch to publish so refreshes land in the order they started.
    refresh_lock: Mutex<()>,
    tx: broadcast::Sender<BoardEvent>,
}

impl TriageBoard {
    /// Create an empty board. Call [`refresh`](Self::refresh) to load it.
    pub fn new(api: Arc<dyn EvaluationApi>, config: BoardConfig) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let empty = columns_of(&config, &[]);
        let snapshot = BoardSnapshot::build(&config, &empty, &[], 0, None);
        Arc::new(Self {
            api,
            config,
            filters: RwLock::new(IntakeFilters::default()),
            state: RwLock::new(BoardState {
                submissions: Vec::new(),
                snapshot,
            }),
            refresh_lock: Mutex::new(()),
            tx,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn EvaluationApi> {
        &self.api
    }

    /// Subscribe to board events. Each WS client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Latest snapshot.
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Filters used for subsequent refreshes.
    pub async fn set_filters(&self, filters: IntakeFilters) {
        *self.filters.write().await = filters;
    }

    /// Re-fetch, re-normalize and re-classify, then broadcast the result.
    ///
    /// A failed fetch yields an empty board rather than an error. Concurrent
    /// refreshes run one at a time, so a fetch issued after a status update
    /// is always the last one published.
    pub async fn refresh(&self) -> BoardSnapshot {
        let _guard = self.refresh_lock.lock().await;
        let filters = self.filters.read().await.clone();
        let page = api::fetch_intakes(self.api.as_ref(), &filters).await;

        let board = columns_of(&self.config, &page.data);
        let snapshot =
            BoardSnapshot::build(&self.config, &board, &page.data, page.total, Some(Utc::now()));

        {
            let mut state = self.state.write().await;
            state.submissions = page.data;
            state.snapshot = snapshot.clone();
        }

        debug!(
            placed = board.placed_count(),
            unplaced = board.unplaced().len(),
            total = snapshot.total,
            "Board refreshed"
        );

        // Broadcast; ok if no receivers are listening yet
        let _ = self.tx.send(BoardEvent::BoardSync {
            board: snapshot.clone(),
        });

        snapshot
    }

    /// Handle a drag-end against the current snapshot.
    ///
    /// No-ops make no network call. Otherwise exactly one status update is
    /// sent; on success the board is refreshed, on failure the error is
    /// returned and the snapshot is left as it was.
    pub async fn handle_drag(
        &self,
        drag: &DragInteraction,
        notes: Option<String>,
    ) -> Result<DragOutcome, ApiError> {
        let transition = {
            let state = self.state.read().await;
            resolve_transition(&self.config, &state.submissions, drag)
        };

        let Some(transition) = transition else {
            debug!(active_id = %drag.active_id, over_id = ?drag.over_id, "Drag resolved to no-op");
            return Ok(DragOutcome::NoOp);
        };

        info!(
            submission_id = %transition.submission_id,
            status = %transition.new_status,
            "Requesting status change"
        );

        if let Err(e) = api::apply_transition(self.api.as_ref(), &transition, notes).await {
            warn!(submission_id = %transition.submission_id, error = %e, "Status update failed");
            let _ = self.tx.send(BoardEvent::TransitionFailed {
                submission_id: transition.submission_id.clone(),
                error: e.to_string(),
            });
            return Err(e);
        }

        let _ = self.tx.send(BoardEvent::TransitionApplied {
            transition: transition.clone(),
        });
        self.refresh().await;

        Ok(DragOutcome::Applied { transition })
    }
}

/// Spawn a background task that periodically refreshes the board.
pub fn spawn_refresh_task(board: Arc<TriageBoard>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            board.refresh().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::testing::StubApi;
    use crate::intake::IntakeStatus;

    fn records() -> Vec<serde_json::Value> {
        vec![
            json!({"id": "p1", "patientName": "Ana", "status": "Pending", "urgency": "urgent"}),
            json!({"id": "i1", "patientName": "Ben", "status": "Reviewed"}),
            json!({"id": "o1", "patientName": "Cy", "status": "Invited"}),
        ]
    }

    fn board_with(api: StubApi) -> (Arc<StubApi>, Arc<TriageBoard>) {
        let api = Arc::new(api);
        let board = TriageBoard::new(api.clone(), BoardConfig::default());
        (api, board)
    }

    #[tokio::test]
    async fn starts_empty_until_refreshed() {
        let (_api, board) = board_with(StubApi::new(records()));
        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.columns.len(), 5);
        assert!(snapshot.columns.iter().all(|c| c.count == 0));
        assert!(snapshot.refreshed_at.is_none());
    }

    #[tokio::test]
    async fn refresh_classifies_and_counts() {
        let (_api, board) = board_with(StubApi::new(records()));
        let snapshot = board.refresh().await;
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.column(ColumnId::Pending).unwrap().count, 1);
        assert_eq!(snapshot.column(ColumnId::Reviewing).unwrap().count, 1);
        assert_eq!(snapshot.unplaced, vec!["o1".to_string()]);
        assert_eq!(snapshot.stats.critical, 1);
        assert!(snapshot.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn refresh_with_failing_backend_gives_empty_board() {
        let mut api = StubApi::new(records());
        api.fail_list = true;
        let (_api, board) = board_with(api);
        let snapshot = board.refresh().await;
        assert_eq!(snapshot.total, 0);
        assert!(snapshot.columns.iter().all(|c| c.intakes.is_empty()));
    }

    #[tokio::test]
    async fn no_op_drag_makes_no_call() {
        let (api, board) = board_with(StubApi::new(records()));
        board.refresh().await;
        let calls_before = api.list_calls();

        let outcome = board
            .handle_drag(&DragInteraction::new("p1", Some("pending")), None)
            .await
            .unwrap();

        assert_eq!(outcome, DragOutcome::NoOp);
        assert!(api.updates().is_empty());
        assert_eq!(api.list_calls(), calls_before);
    }

    #[tokio::test]
    async fn applied_drag_updates_backend_then_refreshes() {
        let (api, board) = board_with(StubApi::new(records()));
        board.refresh().await;
        let mut rx = board.subscribe();

        let outcome = board
            .handle_drag(&DragInteraction::new("i1", Some("scheduled")), Some("ok".into()))
            .await
            .unwrap();

        let expected = Transition {
            submission_id: "i1".into(),
            new_status: "scheduled".into(),
        };
        assert_eq!(
            outcome,
            DragOutcome::Applied {
                transition: expected.clone()
            }
        );
        assert_eq!(api.updates()[0].0, "i1");
        assert_eq!(api.updates()[0].1.notes.as_deref(), Some("ok"));

        match rx.recv().await.unwrap() {
            BoardEvent::TransitionApplied { transition } => assert_eq!(transition, expected),
            other => panic!("Expected TransitionApplied, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            BoardEvent::BoardSync { board } => {
                let scheduled = board.column(ColumnId::Scheduled).unwrap();
                assert_eq!(scheduled.intakes[0].id, "i1");
                assert_eq!(scheduled.intakes[0].status, IntakeStatus::Scheduled);
            }
            other => panic!("Expected BoardSync, got {other:?}"),
        }

        // Same gesture again is now a no-op.
        let again = board
            .handle_drag(&DragInteraction::new("i1", Some("scheduled")), None)
            .await
            .unwrap();
        assert_eq!(again, DragOutcome::NoOp);
    }

    #[tokio::test]
    async fn failed_update_propagates_and_keeps_snapshot() {
        let mut api = StubApi::new(records());
        api.fail_update = true;
        let (api, board) = board_with(api);
        let before = board.refresh().await;
        let calls_before = api.list_calls();
        let mut rx = board.subscribe();

        let err = board
            .handle_drag(&DragInteraction::new("p1", Some("archived")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));

        match rx.recv().await.unwrap() {
            BoardEvent::TransitionFailed { submission_id, .. } => assert_eq!(submission_id, "p1"),
            other => panic!("Expected TransitionFailed, got {other:?}"),
        }
        assert_eq!(api.list_calls(), calls_before);
        assert_eq!(board.snapshot().await, before);
    }

    #[tokio::test]
    async fn filters_apply_to_later_refreshes() {
        let (_api, board) = board_with(StubApi::new(records()));
        assert_eq!(board.refresh().await.total, 3);

        board
            .set_filters(IntakeFilters {
                search: Some("ben".into()),
                ..Default::default()
            })
            .await;
        let snapshot = board.refresh().await;
        assert_eq!(snapshot.total, 1);
        assert_eq!(snapshot.column(ColumnId::Reviewing).unwrap().intakes[0].id, "i1");
        assert!(snapshot.unplaced.is_empty());
    }

    #[tokio::test]
    async fn slow_refresh_does_not_overwrite_a_later_drag() {
        let mut api = StubApi::new(records());
        api.slow_list_call = Some(2);
        let (api, board) = board_with(api);
        board.refresh().await;

        // Periodic refresh starts first and returns pre-drag data late.
        let background = tokio::spawn({
            let board = Arc::clone(&board);
            async move { board.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let gesture = DragInteraction::new("i1", Some("scheduled"));
        let outcome = board.handle_drag(&gesture, None).await.unwrap();
        assert!(matches!(outcome, DragOutcome::Applied { .. }));
        background.await.unwrap();

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.column(ColumnId::Scheduled).unwrap().count, 1);
        assert_eq!(snapshot.column(ColumnId::Reviewing).unwrap().count, 0);

        assert_eq!(board.handle_drag(&gesture, None).await.unwrap(), DragOutcome::NoOp);
        assert_eq!(api.updates().len(), 1);
    }

    #[tokio::test]
    async fn board_event_serde_tags() {
        let event = BoardEvent::TransitionFailed {
            submission_id: "x".into(),
            error: "nope".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"type": "transition_failed", "submissionId": "x", "error": "nope"}));

        let applied = BoardEvent::TransitionApplied {
            transition: Transition {
                submission_id: "x".into(),
                new_status: "archived".into(),
            },
        };
        let json = serde_json::to_value(&applied).unwrap();
        assert_eq!(json["transition"]["submissionId"], "x");

        let outcome = serde_json::to_value(DragOutcome::NoOp).unwrap();
        assert_eq!(outcome, json!({"outcome": "no_op"}));
    }
}
