//! Triage board: column layout, drag transitions and the live service.

pub mod classifier;
pub mod columns;
pub mod routes;
pub mod service;
pub mod transition;

pub use classifier::{ClassifiedBoard, columns_of};
pub use columns::{BoardConfig, Column, ColumnId};
pub use service::{BoardEvent, BoardSnapshot, DragOutcome, TriageBoard};
pub use transition::{DragInteraction, StatusUpdateRequest, Transition, resolve_transition};
