//! Assignment completion-rate recalculation.
//!
//! Values are re-derived from current store state on every run, never
//! incremented, so concurrent runs converge once writes settle.

use tracing::{debug, instrument};

use crate::domain::{AssignmentMetrics, SubmissionStatus};
use crate::store::{DataStore, StoreResult};
use crate::util::round2;

/// `submitted / max(enrolled, 1) * 100`, two decimals.
/// A class with no active enrollments uses a denominator of 1.
pub fn completion_rate(submitted: u64, enrolled_active: u64) -> f64 {
  round2(submitted as f64 / enrolled_active.max(1) as f64 * 100.0)
}

/// Recompute and persist `submission_count` / `completion_rate` for one assignment.
///
/// Returns `Ok(None)` without writing when the assignment is missing or has no class.
#[instrument(level = "debug", skip(store))]
pub async fn recalculate(store: &dyn DataStore, assignment_id: &str) -> StoreResult<Option<AssignmentMetrics>> {
  // Counts `submitted` rows only, not `graded` ones.
  let submission_count = store.count_submissions(assignment_id, SubmissionStatus::Submitted).await?;

  let Some(assignment) = store.get_assignment(assignment_id).await? else {
    debug!(target: "grading", %assignment_id, "Assignment not found; skipping recalculation");
    return Ok(None);
  };
  let Some(class_id) = assignment.class_id.as_deref() else {
    debug!(target: "grading", %assignment_id, "Assignment has no class; skipping recalculation");
    return Ok(None);
  };

  let enrolled = store.count_active_enrollments(class_id).await?;
  let metrics = AssignmentMetrics {
    submission_count,
    completion_rate: completion_rate(submission_count, enrolled),
  };
  store.update_assignment_metrics(assignment_id, metrics).await?;
  debug!(target: "grading", %assignment_id, %class_id, submission_count, enrolled, rate = metrics.completion_rate, "Assignment metrics updated");
  Ok(Some(metrics))
}
