//! Grading: validate a teacher's score against the stored submission and
//! persist it. Re-grading is allowed and simply overwrites.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::domain::{GradePatch, Submission, SubmissionStatus};
use crate::error::{AppError, AppResult};
use crate::protocol::GradeIn;
use crate::store::DataStore;

/// A well-formed grading request.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRequest {
  pub submission_id: String,
  pub score: f64,
  pub feedback: Option<String>,
}

impl GradeIn {
  /// Shape checks only; bounds are checked against the stored submission.
  pub fn validate(self) -> AppResult<GradeRequest> {
    let submission_id = self
      .submission_id
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .ok_or_else(|| AppError::Validation("submissionId is required".into()))?;
    let score = self
      .score
      .as_f64()
      .filter(|s| s.is_finite())
      .ok_or_else(|| AppError::Validation("score must be a number".into()))?;
    Ok(GradeRequest { submission_id, score, feedback: self.feedback })
  }
}

/// Apply `req` to its submission. `now` becomes `graded_at`/`updated_at`.
#[instrument(level = "info", skip(store, req), fields(submission_id = %req.submission_id, score = req.score))]
pub async fn grade_submission(store: &dyn DataStore, req: GradeRequest, now: DateTime<Utc>) -> AppResult<Submission> {
  let existing = store
    .get_submission(&req.submission_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

  let max = f64::from(existing.max_score);
  if req.score < 0.0 || req.score > max {
    return Err(AppError::Validation(format!("Score must be between 0 and {}", existing.max_score)));
  }

  // graded_at never precedes row creation, even under clock skew.
  let graded_at = now.max(existing.created_at);
  let patch = GradePatch {
    score: req.score,
    feedback: req.feedback,
    status: SubmissionStatus::Graded,
    graded_at,
    updated_at: graded_at,
  };
  let updated = store.grade_submission(&existing.id, &patch).await?;
  info!(target: "grading", id = %updated.id, assignment_id = %updated.assignment_id, regrade = existing.status == SubmissionStatus::Graded, "Submission graded");
  Ok(updated)
}
