//! Record normalizer: raw backend records into canonical intake types.
//!
//! All functions here are pure. The only failure is a payload whose top-level
//! shape cannot hold records at all; missing or malformed optional fields fall
//! back to defaults.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{NormalizeError, json_kind};
use crate::intake::model::{
    EvaluationInfo, IntakeDetails, IntakePage, IntakeStatus, IntakeSubmission, PainMap,
    PatientInfo, Severity, UNKNOWN_PATIENT,
};
use crate::intake::raw::{RawEvaluationRecord, to_u8};

/// Envelope keys that hold the record list.
const LIST_KEYS: &[&str] = &["data", "Data", "items", "Items"];
/// Envelope keys that hold the server-side total.
const TOTAL_KEYS: &[&str] = &["total", "Total", "totalCount", "TotalCount"];

/// Map an upstream urgency word to a severity. Unknown or absent → `medium`.
pub fn severity_from_urgency(urgency: Option<&str>) -> Severity {
    let Some(word) = urgency else {
        return Severity::Medium;
    };
    match word.trim().to_lowercase().as_str() {
        "urgent" | "critical" => Severity::Critical,
        "high" => Severity::High,
        "low" => Severity::Low,
        _ => Severity::Medium,
    }
}

/// Map an upstream status word to the canonical status.
///
/// `Triaged` means the intake has been cleared by triage, so it becomes
/// `approved`. Absent or blank → `pending`.
pub fn status_from_raw(status: Option<&str>) -> IntakeStatus {
    let Some(word) = status.map(str::trim).filter(|s| !s.is_empty()) else {
        return IntakeStatus::Pending;
    };
    match word.to_lowercase().as_str() {
        "pending" => IntakeStatus::Pending,
        "reviewed" | "reviewing" => IntakeStatus::Reviewing,
        "triaged" | "approved" => IntakeStatus::Approved,
        "scheduling" => IntakeStatus::Scheduling,
        "scheduled" => IntakeStatus::Scheduled,
        "archived" | "rejected" => IntakeStatus::Archived,
        other => IntakeStatus::Other(other.to_string()),
    }
}

/// Parse RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC), or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert one raw record into a canonical submission.
pub fn normalize(raw: &RawEvaluationRecord) -> IntakeSubmission {
    let patient = raw.patient.as_ref();
    let evaluation = raw.evaluation.as_ref();

    let patient_name = raw
        .patient_name
        .clone()
        .or_else(|| patient.and_then(|p| p.name.clone()))
        .unwrap_or_else(|| UNKNOWN_PATIENT.to_string());

    let severity = severity_from_urgency(raw.urgency.as_deref().or(raw.severity.as_deref()));

    let submitted_at = raw
        .submitted_at
        .as_deref()
        .or_else(|| evaluation.and_then(|e| e.submitted_at.as_deref()))
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let symptoms = if raw.symptoms.is_empty() {
        evaluation.map(|e| e.symptoms.clone()).unwrap_or_default()
    } else {
        raw.symptoms.clone()
    };

    IntakeSubmission {
        id: raw.id.clone().unwrap_or_default(),
        patient_name,
        status: status_from_raw(raw.status.as_deref()),
        severity,
        submitted_at,
        pain_level: raw
            .pain_level
            .or_else(|| evaluation.and_then(|e| e.pain_level))
            .and_then(to_u8),
        symptoms,
        ai_summary: raw.ai_summary.as_ref().map(|s| s.content.clone()),
        assigned_to: raw.assigned_to.clone(),
        condition_type: raw
            .condition_type
            .clone()
            .or_else(|| evaluation.and_then(|e| e.chief_complaint.clone())),
        email: raw
            .email
            .clone()
            .or_else(|| patient.and_then(|p| p.email.clone())),
    }
}

/// Normalize a single JSON record. Fails only when `value` is not an object.
pub fn normalize_value(value: Value) -> Result<IntakeSubmission, NormalizeError> {
    RawEvaluationRecord::from_value(value).map(|raw| normalize(&raw))
}

/// Normalize a list-endpoint payload.
///
/// Accepts a bare array, a `{ data: [...], total }` envelope, or a single
/// record object. Array elements that are not objects are skipped.
pub fn normalize_payload(value: Value) -> Result<IntakePage, NormalizeError> {
    match value {
        Value::Array(items) => {
            let data = normalize_items(items);
            let total = data.len();
            Ok(IntakePage { data, total })
        }
        Value::Object(map) => match list_in_envelope(&map) {
            Some(items) => {
                let data = normalize_items(items.clone());
                let total = envelope_total(&map).unwrap_or(data.len());
                Ok(IntakePage { data, total })
            }
            None => Ok(IntakePage {
                data: vec![normalize(&RawEvaluationRecord::from_map(&map))],
                total: 1,
            }),
        },
        other => Err(NormalizeError::UnexpectedShape {
            expected: "object or array",
            found: json_kind(&other),
        }),
    }
}

/// Normalize a detail-endpoint payload, unwrapping a `{ data: {...} }` envelope.
pub fn normalize_details(value: Value) -> Result<IntakeDetails, NormalizeError> {
    let value = match value {
        Value::Object(mut map) => match take_object_envelope(&mut map) {
            Some(inner) => Value::Object(inner),
            None => Value::Object(map),
        },
        other => other,
    };
    let raw = RawEvaluationRecord::from_value(value)?;
    Ok(details_from_raw(&raw))
}

fn details_from_raw(raw: &RawEvaluationRecord) -> IntakeDetails {
    let submission = normalize(raw);
    let patient = raw.patient.clone().unwrap_or_default();
    let evaluation = raw.evaluation.clone().unwrap_or_default();

    let patient = PatientInfo {
        name: submission.patient_name.clone(),
        email: patient.email.or_else(|| raw.email.clone()),
        phone: patient.phone.or_else(|| raw.phone.clone()),
        date_of_birth: patient.date_of_birth.or_else(|| raw.date_of_birth.clone()),
    };

    let evaluation = EvaluationInfo {
        chief_complaint: evaluation
            .chief_complaint
            .or_else(|| raw.condition_type.clone()),
        symptoms: if evaluation.symptoms.is_empty() {
            raw.symptoms.clone()
        } else {
            evaluation.symptoms
        },
        duration: evaluation.duration,
        pain_level: evaluation.pain_level.or(raw.pain_level).and_then(to_u8),
        submitted_at: evaluation
            .submitted_at
            .as_deref()
            .or(raw.submitted_at.as_deref())
            .and_then(parse_timestamp),
    };

    IntakeDetails {
        submission,
        patient,
        evaluation,
        pain_map: PainMap {
            body_parts: raw.pain_map.clone(),
        },
        ai_summary_details: raw.ai_summary.clone(),
        notes: raw.notes.clone(),
    }
}

fn normalize_items(items: Vec<Value>) -> Vec<IntakeSubmission> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Value::Object(map) => Some(normalize(&RawEvaluationRecord::from_map(&map))),
            other => {
                warn!(index, kind = json_kind(&other), "Skipping non-object evaluation record");
                None
            }
        })
        .collect()
}

fn list_in_envelope(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    LIST_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))
}

fn envelope_total(map: &Map<String, Value>) -> Option<usize> {
    TOTAL_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_u64))
        .and_then(|t| usize::try_from(t).ok())
}

fn take_object_envelope(map: &mut Map<String, Value>) -> Option<Map<String, Value>> {
    let key = LIST_KEYS
        .iter()
        .find(|k| map.get(**k).is_some_and(Value::is_object))?;
    match map.remove(*key) {
        Some(Value::Object(inner)) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn norm(value: Value) -> IntakeSubmission {
        normalize_value(value).unwrap()
    }

    #[test]
    fn empty_record_gets_defaults() {
        let sub = norm(json!({}));
        assert_eq!(sub.patient_name, UNKNOWN_PATIENT);
        assert_eq!(sub.severity, Severity::Medium);
        assert_eq!(sub.status, IntakeStatus::Pending);
        assert_eq!(sub.submitted_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(sub.id.is_empty());
        assert!(sub.pain_level.is_none());
        assert!(sub.symptoms.is_empty());
    }

    #[test]
    fn urgency_maps_to_severity() {
        assert_eq!(norm(json!({"urgency": "urgent"})).severity, Severity::Critical);
        assert_eq!(norm(json!({"urgency": "low"})).severity, Severity::Low);
        assert_eq!(norm(json!({"Urgency": "HIGH"})).severity, Severity::High);
        assert_eq!(norm(json!({"urgency": "whenever"})).severity, Severity::Medium);
    }

    #[test]
    fn severity_field_is_used_when_urgency_absent() {
        assert_eq!(norm(json!({"severity": "critical"})).severity, Severity::Critical);
        assert_eq!(
            norm(json!({"urgency": "low", "severity": "critical"})).severity,
            Severity::Low
        );
    }

    #[test]
    fn raw_status_maps_to_canonical() {
        assert_eq!(norm(json!({"status": "Pending"})).status, IntakeStatus::Pending);
        assert_eq!(norm(json!({"status": "Reviewed"})).status, IntakeStatus::Reviewing);
        assert_eq!(norm(json!({"status": "Triaged"})).status, IntakeStatus::Approved);
        assert_eq!(norm(json!({"Status": "Archived"})).status, IntakeStatus::Archived);
        assert_eq!(norm(json!({"status": "rejected"})).status, IntakeStatus::Archived);
        assert_eq!(norm(json!({"status": "scheduled"})).status, IntakeStatus::Scheduled);
        assert_eq!(norm(json!({"status": "Scheduling"})).status, IntakeStatus::Scheduling);
        assert_eq!(norm(json!({"status": ""})).status, IntakeStatus::Pending);
    }

    #[test]
    fn unrecognised_status_is_preserved() {
        assert_eq!(
            norm(json!({"status": "Invited"})).status,
            IntakeStatus::Other("invited".into())
        );
    }

    #[test]
    fn optional_fields_pass_through() {
        let sub = norm(json!({
            "id": "e9",
            "patientName": "Jane Doe",
            "submittedAt": "2026-03-10T09:30:00Z",
            "painLevel": 6,
            "symptoms": ["stiffness"],
            "aiSummary": {"content": "Meniscus strain"},
            "assignedTo": "dr-lee",
            "conditionType": "Knee pain",
            "email": "jane@example.com"
        }));
        assert_eq!(sub.id, "e9");
        assert_eq!(sub.submitted_at, Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap());
        assert_eq!(sub.pain_level, Some(6));
        assert_eq!(sub.symptoms, vec!["stiffness"]);
        assert_eq!(sub.ai_summary.as_deref(), Some("Meniscus strain"));
        assert_eq!(sub.assigned_to.as_deref(), Some("dr-lee"));
        assert_eq!(sub.condition_type.as_deref(), Some("Knee pain"));
        assert_eq!(sub.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn nested_sections_fill_missing_top_level_fields() {
        let sub = norm(json!({
            "patient": {"name": "Ana Silva", "email": "ana@example.com"},
            "evaluation": {
                "chiefComplaint": "Shoulder pain",
                "symptoms": ["weakness"],
                "painLevel": "4",
                "submittedAt": "2026-01-02"
            }
        }));
        assert_eq!(sub.patient_name, "Ana Silva");
        assert_eq!(sub.email.as_deref(), Some("ana@example.com"));
        assert_eq!(sub.condition_type.as_deref(), Some("Shoulder pain"));
        assert_eq!(sub.symptoms, vec!["weakness"]);
        assert_eq!(sub.pain_level, Some(4));
        assert_eq!(sub.submitted_at, Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn timestamps_in_several_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2026-03-10T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_epoch() {
        let sub = norm(json!({"submittedAt": "last tuesday"}));
        assert_eq!(sub.submitted_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn non_object_record_is_a_hard_failure() {
        assert!(normalize_value(json!("e1")).is_err());
        assert!(normalize_value(json!(null)).is_err());
    }

    #[test]
    fn payload_array() {
        let page = normalize_payload(json!([
            {"id": "a", "status": "Pending"},
            "garbage",
            {"id": "b", "status": "Reviewed"}
        ]))
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].id, "a");
        assert_eq!(page.data[1].status, IntakeStatus::Reviewing);
    }

    #[test]
    fn payload_envelope_uses_server_total() {
        let page = normalize_payload(json!({
            "data": [{"id": "a"}, {"id": "b"}],
            "total": 57
        }))
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total, 57);

        let page = normalize_payload(json!({"Items": [{"Id": "x"}]})).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, "x");
    }

    #[test]
    fn payload_single_object_is_one_record() {
        let page = normalize_payload(json!({"id": "solo", "PatientName": "Sam"})).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].patient_name, "Sam");
    }

    #[test]
    fn payload_scalar_is_rejected() {
        let err = normalize_payload(json!(42)).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::UnexpectedShape { found: "number", .. }
        ));
    }

    #[test]
    fn details_combine_nested_and_top_level() {
        let details = normalize_details(json!({
            "data": {
                "id": "d1",
                "patientName": "Ana Silva",
                "status": "Triaged",
                "urgency": "urgent",
                "phone": "555-0101",
                "conditionType": "Shoulder pain",
                "patient": {"email": "ana@example.com"},
                "evaluation": {"duration": "3 weeks", "painLevel": 8},
                "painMap": {"bodyParts": [{"region": "Left Shoulder", "intensity": 8}]},
                "aiSummary": {"content": "Rotator cuff", "recommendations": ["imaging"]},
                "notes": "Called patient"
            }
        }))
        .unwrap();
        assert_eq!(details.submission.id, "d1");
        assert_eq!(details.submission.status, IntakeStatus::Approved);
        assert_eq!(details.submission.severity, Severity::Critical);
        assert_eq!(details.patient.name, "Ana Silva");
        assert_eq!(details.patient.email.as_deref(), Some("ana@example.com"));
        assert_eq!(details.patient.phone.as_deref(), Some("555-0101"));
        assert_eq!(details.evaluation.chief_complaint.as_deref(), Some("Shoulder pain"));
        assert_eq!(details.evaluation.duration.as_deref(), Some("3 weeks"));
        assert_eq!(details.evaluation.pain_level, Some(8));
        assert_eq!(details.pain_map.body_parts.len(), 1);
        assert_eq!(
            details.ai_summary_details.unwrap().recommendations,
            vec!["imaging"]
        );
        assert_eq!(details.notes.as_deref(), Some("Called patient"));
    }

    #[test]
    fn details_patient_name_defaults_too() {
        let details = normalize_details(json!({"id": "d2"})).unwrap();
        assert_eq!(details.patient.name, UNKNOWN_PATIENT);
        assert!(details.pain_map.body_parts.is_empty());
    }

    #[test]
    fn details_reject_non_object() {
        assert!(normalize_details(json!([{"id": "d3"}])).is_err());
    }

    #[test]
    fn normalization_is_deterministic() {
        let raw = json!({"id": "r1", "status": "Reviewed", "urgency": "urgent"});
        assert_eq!(norm(raw.clone()), norm(raw));
    }
}
