//! Intake records: canonical model and the normalization boundary.
//!
//! Raw backend payloads enter through [`raw::RawEvaluationRecord`] and leave
//! [`normalize`] as [`model::IntakeSubmission`] / [`model::IntakeDetails`].
//! Nothing downstream reads raw field names.

pub mod model;
pub mod normalize;
pub mod raw;

pub use model::{
    IntakeDetails, IntakeFilters, IntakePage, IntakeStats, IntakeStatus, IntakeSubmission,
    Severity, UNKNOWN_PATIENT,
};
pub use normalize::{normalize, normalize_details, normalize_payload, normalize_value};
pub use raw::RawEvaluationRecord;
