//! Intake data model: canonical submissions and their details.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Patient name used when the backend does not send one.
pub const UNKNOWN_PATIENT: &str = "Unknown patient";

/// Workflow stage of a submission.
///
/// `Pending`, `Reviewing`, `Approved` and `Archived` are the canonical
/// workflow tokens. `Scheduling` and `Scheduled` are board stages fed by the
/// same field. Anything else survives as `Other` so it can be shown, but it
/// belongs to no board column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum IntakeStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Archived,
    Scheduling,
    Scheduled,
    Other(String),
}

impl IntakeStatus {
    /// Lower-case token used for column membership.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Archived => "archived",
            Self::Scheduling => "scheduling",
            Self::Scheduled => "scheduled",
            Self::Other(token) => token,
        }
    }

    /// Parse an already-canonical token. Unknown tokens become `Other`.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        match token.as_str() {
            "pending" => Self::Pending,
            "reviewing" => Self::Reviewing,
            "approved" => Self::Approved,
            "archived" => Self::Archived,
            "scheduling" => Self::Scheduling,
            "scheduled" => Self::Scheduled,
            _ => Self::Other(token),
        }
    }
}

impl std::fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IntakeStatus> for String {
    fn from(status: IntakeStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for IntakeStatus {
    fn from(token: String) -> Self {
        Self::from_token(&token)
    }
}

/// Clinical urgency tier, independent of workflow stage.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// A patient intake record awaiting triage, as the board sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    /// Opaque backend identifier.
    pub id: String,
    pub patient_name: String,
    pub status: IntakeStatus,
    pub severity: Severity,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Presenting condition (chief complaint).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl IntakeSubmission {
    /// Create a submission with every optional field empty.
    pub fn new(
        id: impl Into<String>,
        patient_name: impl Into<String>,
        status: IntakeStatus,
        severity: Severity,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            patient_name: patient_name.into(),
            status,
            severity,
            submitted_at,
            pain_level: None,
            symptoms: Vec::new(),
            ai_summary: None,
            assigned_to: None,
            condition_type: None,
            email: None,
        }
    }

    /// Builder: set condition type.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition_type = Some(condition.into());
        self
    }

    /// Builder: set email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Lower-cased status token.
    pub fn status_token(&self) -> String {
        self.status.as_str().to_lowercase()
    }
}

/// Patient demographics attached to a detailed intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

/// The evaluation questionnaire section of a detailed intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A single marked region on the body pain map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPoint {
    pub region: String,
    pub intensity: u8,
    /// Pain quality ("dull", "sharp", ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainMap {
    #[serde(default)]
    pub body_parts: Vec<PainPoint>,
}

/// AI triage summary, consumed as opaque data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub content: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub approved: bool,
}

/// Full view of one intake, as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeDetails {
    #[serde(flatten)]
    pub submission: IntakeSubmission,
    pub patient: PatientInfo,
    pub evaluation: EvaluationInfo,
    pub pain_map: PainMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary_details: Option<AiSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One page of normalized submissions from the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakePage {
    pub data: Vec<IntakeSubmission>,
    pub total: usize,
}

impl IntakePage {
    /// The degraded result used when the list endpoint fails.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Query filters for the list endpoint, also applicable locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl IntakeFilters {
    /// Non-empty query parameters, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("status", status.trim().to_string()));
        }
        if let Some(severity) = self.severity {
            pairs.push(("severity", severity.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        pairs
    }

    /// Whether a submission passes these filters.
    ///
    /// Search is a case-insensitive substring match over patient name,
    /// email and condition type.
    pub fn matches(&self, intake: &IntakeSubmission) -> bool {
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            if intake.status_token() != status.trim().to_lowercase() {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if intake.severity != severity {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim().to_lowercase();
            let hit = intake.patient_name.to_lowercase().contains(&needle)
                || intake
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
                || intake
                    .condition_type
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Headline counts for the intake dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeStats {
    pub total: usize,
    pub pending: usize,
    pub reviewing: usize,
    /// Approved, scheduled or archived.
    pub processed: usize,
    pub critical: usize,
    /// Submitted on the reference date.
    pub today: usize,
}

impl IntakeStats {
    pub fn compute(intakes: &[IntakeSubmission], today: NaiveDate) -> Self {
        let mut stats = Self {
            total: intakes.len(),
            ..Self::default()
        };
        for intake in intakes {
            match intake.status {
                IntakeStatus::Pending => stats.pending += 1,
                IntakeStatus::Reviewing => stats.reviewing += 1,
                IntakeStatus::Approved | IntakeStatus::Scheduled | IntakeStatus::Archived => {
                    stats.processed += 1
                }
                IntakeStatus::Scheduling | IntakeStatus::Other(_) => {}
            }
            if intake.severity == Severity::Critical {
                stats.critical += 1;
            }
            if intake.submitted_at.date_naive() == today {
                stats.today += 1;
            }
        }
        stats
    }
}
