//! Domain records as they live in the backend store: submissions, assignments,
//! enrollments, profiles, guardians, timed tests and the analytics inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-authoritative submission status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
  Draft,
  Submitted,
  Graded,
}

impl SubmissionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      SubmissionStatus::Draft => "draft",
      SubmissionStatus::Submitted => "submitted",
      SubmissionStatus::Graded => "graded",
    }
  }
}

/// Two-state status exposed to clients.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
  Pending,
  Graded,
}

/// Collapse the persisted three-state status into the client view.
pub fn client_status(status: SubmissionStatus) -> ClientStatus {
  match status {
    SubmissionStatus::Graded => ClientStatus::Graded,
    SubmissionStatus::Draft | SubmissionStatus::Submitted => ClientStatus::Pending,
  }
}

/// One student's work on one assignment.
/// Invariant: `status == Graded` implies `score` and `graded_at` are set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
  pub id: String,
  pub student_id: String,
  pub assignment_id: String,
  #[serde(default)] pub answers: serde_json::Value,
  pub status: SubmissionStatus,
  #[serde(default)] pub score: Option<f64>,
  pub max_score: u32,
  #[serde(default)] pub feedback: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)] pub submitted_at: Option<DateTime<Utc>>,
  #[serde(default)] pub graded_at: Option<DateTime<Utc>>,
  #[serde(default)] pub updated_at: Option<DateTime<Utc>>,
}

impl Submission {
  /// `submitted_at`, falling back to row creation time.
  pub fn effective_submitted_at(&self) -> DateTime<Utc> {
    self.submitted_at.unwrap_or(self.created_at)
  }
}

/// Fields written by a grading call.
#[derive(Clone, Debug, Serialize)]
pub struct GradePatch {
  pub score: f64,
  pub feedback: Option<String>,
  pub status: SubmissionStatus,
  pub graded_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A unit of work scoped to a class. `submission_count` and
/// `completion_rate` are derived and only eventually consistent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
  pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub class_id: Option<String>,
  #[serde(default)] pub teacher_id: Option<String>,
  #[serde(default)] pub due_date: Option<DateTime<Utc>>,
  #[serde(default)] pub submission_count: u64,
  #[serde(default)] pub completion_rate: f64,
}

/// Aggregate fields written by the completion-rate recalculation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AssignmentMetrics {
  pub submission_count: u64,
  pub completion_rate: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
  Active,
  #[serde(other)]
  Inactive,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Enrollment {
  pub class_id: String,
  pub student_id: String,
  pub status: EnrollmentStatus,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Teacher,
  Student,
  #[serde(other)]
  Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
  pub id: String,
  #[serde(default)] pub full_name: String,
  #[serde(default)] pub email: Option<String>,
  pub role: Role,
}

/// Contact record owned by a student.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Guardian {
  pub id: String,
  pub student_id: String,
  pub email: String,
  #[serde(default)] pub phone: Option<String>,
  #[serde(default)] pub relationship: Option<String>,
}

/// Administrative test status. Only `draft` and `closed` override the date window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestAdminStatus {
  Draft,
  Closed,
  #[serde(other)]
  Published,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveTestStatus {
  Draft,
  Closed,
  Scheduled,
  Active,
  Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Test {
  pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub class_id: Option<String>,
  #[serde(default)] pub status: Option<TestAdminStatus>,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  #[serde(default = "default_test_max_score")] pub max_score: u32,
}

fn default_test_max_score() -> u32 { 100 }

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
  NotStarted,
  InProgress,
  Submitted,
  Graded,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestAttempt {
  pub id: String,
  pub test_id: String,
  pub student_id: String,
  pub status: AttemptStatus,
  #[serde(default)] pub score: Option<f64>,
  #[serde(default)] pub started_at: Option<DateTime<Utc>>,
  #[serde(default)] pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lesson {
  pub id: String,
  pub class_id: String,
  #[serde(default)] pub title: String,
}

/// A student finishing a lesson; `score` is already a percentage when present.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonCompletion {
  pub lesson_id: String,
  pub student_id: String,
  pub completed_at: DateTime<Utc>,
  #[serde(default)] pub score: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudySession {
  pub student_id: String,
  pub class_id: String,
  pub started_at: DateTime<Utc>,
  pub duration_minutes: f64,
}
