//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{ClassAnalytics, ContentPerformance};
use crate::domain::{client_status, AttemptStatus, ClientStatus, EffectiveTestStatus, Submission};

/// Derived submission view returned by grading and read endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmissionView {
  pub id: String,
  pub student_id: String,
  pub assignment_id: String,
  pub answers: serde_json::Value,
  pub status: ClientStatus,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub score: Option<f64>,
  pub max_score: u32,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub feedback: Option<String>,
  pub submitted_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub graded_at: Option<DateTime<Utc>>,
}

/// Project a persisted submission into the client view.
pub fn to_view(s: &Submission) -> SubmissionView {
  SubmissionView {
    id: s.id.clone(),
    student_id: s.student_id.clone(),
    assignment_id: s.assignment_id.clone(),
    answers: s.answers.clone(),
    status: client_status(s.status),
    score: s.score,
    max_score: s.max_score,
    feedback: s.feedback.clone(),
    submitted_at: s.effective_submitted_at(),
    graded_at: s.graded_at,
  }
}

//
// HTTP request/response DTOs
//

/// Raw grading body. Fields stay loose so shape errors become validation errors.
#[derive(Debug, Deserialize)]
pub struct GradeIn {
  #[serde(rename = "submissionId", default)]
  pub submission_id: Option<String>,
  #[serde(default)]
  pub score: serde_json::Value,
  #[serde(default)]
  pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotifyIn {
  #[serde(rename = "type", default)]
  pub kind: Option<String>,
  #[serde(default)]
  pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyOut {
  pub success: bool,
  #[serde(rename = "sentTo")]
  pub sent_to: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecalcOut {
  pub assignment_id: String,
  pub updated: bool,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub submission_count: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub completion_rate: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestStatusOut {
  pub test_id: String,
  pub status: EffectiveTestStatus,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
}

/// One monitoring row per enrolled student; `not_started` rows may be synthesized.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AttemptRow {
  pub student_id: String,
  pub student_name: String,
  pub status: AttemptStatus,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub score: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GuardianIn {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub relationship: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
  pub top: Option<usize>,
  pub bottom: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOut {
  #[serde(flatten)]
  pub report: ClassAnalytics,
  pub most_completed: Vec<ContentPerformance>,
  pub least_completed: Vec<ContentPerformance>,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
