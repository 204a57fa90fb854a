//! Permissive input schema for backend evaluation records.
//!
//! Backends disagree on casing (`patientName` vs `PatientName`), on types
//! (numeric vs string ids, pain levels sent as strings) and on which fields
//! they send at all. Every field here is optional and every lookup tries the
//! known spellings, so nothing past this module guesses field names.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{NormalizeError, json_kind};
use crate::intake::model::{AiSummary, PainPoint};

/// Nested `patient` object of a detailed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPatient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
}

/// Nested `evaluation` object of a detailed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvaluation {
    pub chief_complaint: Option<String>,
    pub symptoms: Vec<String>,
    pub duration: Option<String>,
    pub pain_level: Option<f64>,
    pub submitted_at: Option<String>,
}

/// A loosely-typed evaluation record as received from the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct RawEvaluationRecord {
    pub id: Option<String>,
    pub patient_name: Option<String>,
    pub status: Option<String>,
    pub urgency: Option<String>,
    pub severity: Option<String>,
    pub submitted_at: Option<String>,
    pub pain_level: Option<f64>,
    pub symptoms: Vec<String>,
    pub ai_summary: Option<AiSummary>,
    pub assigned_to: Option<String>,
    pub condition_type: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub notes: Option<String>,
    pub patient: Option<RawPatient>,
    pub evaluation: Option<RawEvaluation>,
    pub pain_map: Vec<PainPoint>,
}

impl RawEvaluationRecord {
    /// Read a record from any JSON value. Only non-objects are rejected.
    pub fn from_value(value: Value) -> Result<Self, NormalizeError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(NormalizeError::UnexpectedShape {
                expected: "object",
                found: json_kind(&other),
            }),
        }
    }

    /// Read a record from a JSON object. Never fails.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            id: string_field(map, &["id", "Id", "ID", "evaluationId", "EvaluationId"]),
            patient_name: string_field(map, &["patientName", "PatientName", "patient_name"]),
            status: string_field(map, &["status", "Status"]),
            urgency: string_field(map, &["urgency", "Urgency"]),
            severity: string_field(map, &["severity", "Severity"]),
            submitted_at: string_field(
                map,
                &["submittedAt", "SubmittedAt", "createdAt", "CreatedAt", "submitted_at"],
            ),
            pain_level: number_field(map, &["painLevel", "PainLevel", "pain_level"]),
            symptoms: string_list(map, &["symptoms", "Symptoms"]),
            ai_summary: ai_summary_field(map, &["aiSummary", "AiSummary", "ai_summary"]),
            assigned_to: string_field(map, &["assignedTo", "AssignedTo", "assigned_to"]),
            condition_type: string_field(
                map,
                &["conditionType", "ConditionType", "chiefComplaint", "ChiefComplaint"],
            ),
            email: string_field(map, &["email", "Email", "patientEmail", "PatientEmail"]),
            phone: string_field(map, &["phone", "Phone", "patientPhone", "PatientPhone"]),
            date_of_birth: string_field(map, &["dateOfBirth", "DateOfBirth"]),
            notes: string_field(map, &["notes", "Notes"]),
            patient: object_field(map, &["patient", "Patient"]).map(raw_patient),
            evaluation: object_field(map, &["evaluation", "Evaluation"]).map(raw_evaluation),
            pain_map: pain_points(map),
        }
    }
}

impl TryFrom<Value> for RawEvaluationRecord {
    type Error = NormalizeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn raw_patient(map: &Map<String, Value>) -> RawPatient {
    let name = string_field(map, &["name", "Name", "fullName", "FullName"]).or_else(|| {
        let first = string_field(map, &["firstName", "FirstName"]);
        let last = string_field(map, &["lastName", "LastName"]);
        match (first, last) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(f), None) => Some(f),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        }
    });
    RawPatient {
        name,
        email: string_field(map, &["email", "Email"]),
        phone: string_field(map, &["phone", "Phone"]),
        date_of_birth: string_field(map, &["dateOfBirth", "DateOfBirth"]),
    }
}

fn raw_evaluation(map: &Map<String, Value>) -> RawEvaluation {
    RawEvaluation {
        chief_complaint: string_field(
            map,
            &["chiefComplaint", "ChiefComplaint", "conditionType", "ConditionType"],
        ),
        symptoms: string_list(map, &["symptoms", "Symptoms"]),
        duration: string_field(map, &["duration", "Duration"]),
        pain_level: number_field(map, &["painLevel", "PainLevel"]),
        submitted_at: string_field(
            map,
            &["submittedAt", "SubmittedAt", "createdAt", "CreatedAt"],
        ),
    }
}

/// `painMap.bodyParts`, tolerating either casing at both levels.
fn pain_points(map: &Map<String, Value>) -> Vec<PainPoint> {
    let Some(pain_map) = object_field(map, &["painMap", "PainMap"]) else {
        return Vec::new();
    };
    let Some(Value::Array(parts)) = lookup(pain_map, &["bodyParts", "BodyParts"]) else {
        return Vec::new();
    };
    parts
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|part| {
            let region = string_field(part, &["region", "Region"])?;
            let intensity = number_field(part, &["intensity", "Intensity"])
                .and_then(to_u8)
                .unwrap_or(0);
            Some(PainPoint {
                region,
                intensity,
                kind: string_field(part, &["type", "Type", "quality", "Quality"]),
            })
        })
        .collect()
}

fn ai_summary_field(map: &Map<String, Value>, keys: &[&str]) -> Option<AiSummary> {
    match lookup(map, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(AiSummary {
            content: s.trim().to_string(),
            ..Default::default()
        }),
        Value::Object(obj) => {
            let content = string_field(obj, &["content", "Content", "summary", "Summary"])?;
            Some(AiSummary {
                content,
                risk_factors: string_list(obj, &["riskFactors", "RiskFactors"]),
                recommendations: string_list(obj, &["recommendations", "Recommendations"]),
                approved: lookup(obj, &["approved", "Approved"])
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        }
        _ => None,
    }
}

/// First non-null value under any of `keys`.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn object_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    lookup(map, keys).and_then(Value::as_object)
}

/// Trimmed, non-empty string. Numbers and booleans are stringified.
fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match lookup(map, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let number = match lookup(map, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Array of strings, or a single comma-separated string.
fn string_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match lookup(map, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Round into `u8` range, or `None` when out of range.
pub(crate) fn to_u8(value: f64) -> Option<u8> {
    let rounded = value.round();
    (0.0..=f64::from(u8::MAX))
        .contains(&rounded)
        .then_some(rounded as u8)
}
