//! Intake triage: evaluation normalization and the triage board.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod intake;
