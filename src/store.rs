//! Storage seam: the `DataStore` / `SessionResolver` traits the pipeline talks
//! to, and the in-memory implementation used for demo mode and tests.
//!
//! The in-memory store keeps one `RwLock`ed table per entity. Lookups clone
//! rows out so no lock is held across an await point in callers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::domain::*;
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed access to the relational store. Exact queries are the implementor's concern.
#[async_trait]
pub trait DataStore: Send + Sync {
  async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>>;
  /// Apply a grade; `StoreError::Missing` if the row vanished.
  async fn grade_submission(&self, id: &str, patch: &GradePatch) -> StoreResult<Submission>;
  async fn list_submissions(&self, assignment_ids: &[String]) -> StoreResult<Vec<Submission>>;
  async fn count_submissions(&self, assignment_id: &str, status: SubmissionStatus) -> StoreResult<u64>;

  async fn get_assignment(&self, id: &str) -> StoreResult<Option<Assignment>>;
  async fn list_assignments_for_class(&self, class_id: &str) -> StoreResult<Vec<Assignment>>;
  async fn update_assignment_metrics(&self, id: &str, metrics: AssignmentMetrics) -> StoreResult<()>;

  async fn list_enrollments(&self, class_id: &str) -> StoreResult<Vec<Enrollment>>;
  async fn count_active_enrollments(&self, class_id: &str) -> StoreResult<u64>;

  async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>>;
  async fn list_profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>>;

  async fn list_guardians(&self, student_id: &str) -> StoreResult<Vec<Guardian>>;
  async fn insert_guardian(&self, guardian: &Guardian) -> StoreResult<Guardian>;
  /// Returns false when no guardian with that id belongs to the student.
  async fn delete_guardian(&self, student_id: &str, guardian_id: &str) -> StoreResult<bool>;

  async fn get_test(&self, id: &str) -> StoreResult<Option<Test>>;
  async fn list_tests_for_class(&self, class_id: &str) -> StoreResult<Vec<Test>>;
  async fn list_attempts(&self, test_ids: &[String]) -> StoreResult<Vec<TestAttempt>>;

  async fn list_lessons_for_class(&self, class_id: &str) -> StoreResult<Vec<Lesson>>;
  async fn list_lesson_completions(&self, lesson_ids: &[String]) -> StoreResult<Vec<LessonCompletion>>;
  async fn list_study_sessions(&self, class_id: &str) -> StoreResult<Vec<StudySession>>;
}

/// Resolves a bearer token to a user id, or `None` if the session is invalid.
#[async_trait]
pub trait SessionResolver: Send + Sync {
  async fn resolve_token(&self, token: &str) -> StoreResult<Option<String>>;
}

/// Plain table contents used to build a `MemoryStore`.
#[derive(Clone, Debug, Default)]
pub struct MemoryData {
  pub submissions: Vec<Submission>,
  pub assignments: Vec<Assignment>,
  pub enrollments: Vec<Enrollment>,
  pub profiles: Vec<Profile>,
  pub guardians: Vec<Guardian>,
  pub tests: Vec<Test>,
  pub attempts: Vec<TestAttempt>,
  pub lessons: Vec<Lesson>,
  pub lesson_completions: Vec<LessonCompletion>,
  pub sessions: Vec<StudySession>,
  /// token -> user id
  pub tokens: Vec<(String, String)>,
}

pub struct MemoryStore {
  submissions: RwLock<HashMap<String, Submission>>,
  assignments: RwLock<HashMap<String, Assignment>>,
  enrollments: RwLock<Vec<Enrollment>>,
  profiles: RwLock<HashMap<String, Profile>>,
  guardians: RwLock<Vec<Guardian>>,
  tests: RwLock<HashMap<String, Test>>,
  attempts: RwLock<Vec<TestAttempt>>,
  lessons: RwLock<Vec<Lesson>>,
  lesson_completions: RwLock<Vec<LessonCompletion>>,
  sessions: RwLock<Vec<StudySession>>,
  tokens: RwLock<HashMap<String, String>>,
}

fn by_id<T, F: Fn(&T) -> String>(rows: Vec<T>, key: F) -> HashMap<String, T> {
  rows.into_iter().map(|r| (key(&r), r)).collect()
}

impl MemoryStore {
  pub fn new(data: MemoryData) -> Self {
    Self {
      submissions: RwLock::new(by_id(data.submissions, |s| s.id.clone())),
      assignments: RwLock::new(by_id(data.assignments, |a| a.id.clone())),
      enrollments: RwLock::new(data.enrollments),
      profiles: RwLock::new(by_id(data.profiles, |p| p.id.clone())),
      guardians: RwLock::new(data.guardians),
      tests: RwLock::new(by_id(data.tests, |t| t.id.clone())),
      attempts: RwLock::new(data.attempts),
      lessons: RwLock::new(data.lessons),
      lesson_completions: RwLock::new(data.lesson_completions),
      sessions: RwLock::new(data.sessions),
      tokens: RwLock::new(data.tokens.into_iter().collect()),
    }
  }
}

#[async_trait]
impl DataStore for MemoryStore {
  async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
    Ok(self.submissions.read().await.get(id).cloned())
  }

  #[instrument(level = "debug", skip(self, patch))]
  async fn grade_submission(&self, id: &str, patch: &GradePatch) -> StoreResult<Submission> {
    let mut subs = self.submissions.write().await;
    let s = subs.get_mut(id).ok_or_else(|| StoreError::Missing(format!("submission {id}")))?;
    s.score = Some(patch.score);
    s.feedback = patch.feedback.clone();
    s.status = patch.status;
    s.graded_at = Some(patch.graded_at);
    s.updated_at = Some(patch.updated_at);
    Ok(s.clone())
  }

  async fn list_submissions(&self, assignment_ids: &[String]) -> StoreResult<Vec<Submission>> {
    let subs = self.submissions.read().await;
    let mut out: Vec<Submission> = subs
      .values()
      .filter(|s| assignment_ids.contains(&s.assignment_id))
      .cloned()
      .collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(out)
  }

  async fn count_submissions(&self, assignment_id: &str, status: SubmissionStatus) -> StoreResult<u64> {
    let subs = self.submissions.read().await;
    Ok(subs.values().filter(|s| s.assignment_id == assignment_id && s.status == status).count() as u64)
  }

  async fn get_assignment(&self, id: &str) -> StoreResult<Option<Assignment>> {
    Ok(self.assignments.read().await.get(id).cloned())
  }

  async fn list_assignments_for_class(&self, class_id: &str) -> StoreResult<Vec<Assignment>> {
    let rows = self.assignments.read().await;
    let mut out: Vec<Assignment> = rows
      .values()
      .filter(|a| a.class_id.as_deref() == Some(class_id))
      .cloned()
      .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_assignment_metrics(&self, id: &str, metrics: AssignmentMetrics) -> StoreResult<()> {
    let mut rows = self.assignments.write().await;
    let a = rows.get_mut(id).ok_or_else(|| StoreError::Missing(format!("assignment {id}")))?;
    a.submission_count = metrics.submission_count;
    a.completion_rate = metrics.completion_rate;
    Ok(())
  }

  async fn list_enrollments(&self, class_id: &str) -> StoreResult<Vec<Enrollment>> {
    let rows = self.enrollments.read().await;
    Ok(rows.iter().filter(|e| e.class_id == class_id).cloned().collect())
  }

  async fn count_active_enrollments(&self, class_id: &str) -> StoreResult<u64> {
    let rows = self.enrollments.read().await;
    Ok(rows.iter().filter(|e| e.class_id == class_id && e.status == EnrollmentStatus::Active).count() as u64)
  }

  async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
    Ok(self.profiles.read().await.get(id).cloned())
  }

  async fn list_profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>> {
    let rows = self.profiles.read().await;
    Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
  }

  async fn list_guardians(&self, student_id: &str) -> StoreResult<Vec<Guardian>> {
    let rows = self.guardians.read().await;
    Ok(rows.iter().filter(|g| g.student_id == student_id).cloned().collect())
  }

  async fn insert_guardian(&self, guardian: &Guardian) -> StoreResult<Guardian> {
    self.guardians.write().await.push(guardian.clone());
    Ok(guardian.clone())
  }

  async fn delete_guardian(&self, student_id: &str, guardian_id: &str) -> StoreResult<bool> {
    let mut rows = self.guardians.write().await;
    let before = rows.len();
    rows.retain(|g| !(g.id == guardian_id && g.student_id == student_id));
    Ok(rows.len() != before)
  }

  async fn get_test(&self, id: &str) -> StoreResult<Option<Test>> {
    Ok(self.tests.read().await.get(id).cloned())
  }

  async fn list_tests_for_class(&self, class_id: &str) -> StoreResult<Vec<Test>> {
    let rows = self.tests.read().await;
    Ok(rows.values().filter(|t| t.class_id.as_deref() == Some(class_id)).cloned().collect())
  }

  async fn list_attempts(&self, test_ids: &[String]) -> StoreResult<Vec<TestAttempt>> {
    let rows = self.attempts.read().await;
    Ok(rows.iter().filter(|a| test_ids.contains(&a.test_id)).cloned().collect())
  }

  async fn list_lessons_for_class(&self, class_id: &str) -> StoreResult<Vec<Lesson>> {
    let rows = self.lessons.read().await;
    Ok(rows.iter().filter(|l| l.class_id == class_id).cloned().collect())
  }

  async fn list_lesson_completions(&self, lesson_ids: &[String]) -> StoreResult<Vec<LessonCompletion>> {
    let rows = self.lesson_completions.read().await;
    Ok(rows.iter().filter(|c| lesson_ids.contains(&c.lesson_id)).cloned().collect())
  }

  async fn list_study_sessions(&self, class_id: &str) -> StoreResult<Vec<StudySession>> {
    let rows = self.sessions.read().await;
    Ok(rows.iter().filter(|s| s.class_id == class_id).cloned().collect())
  }
}

#[async_trait]
impl SessionResolver for MemoryStore {
  async fn resolve_token(&self, token: &str) -> StoreResult<Option<String>> {
    Ok(self.tokens.read().await.get(token).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn guardian(id: &str, student: &str) -> Guardian {
    Guardian { id: id.into(), student_id: student.into(), email: format!("{id}@example.com"), phone: None, relationship: None }
  }

  #[tokio::test]
  async fn delete_guardian_only_touches_owner_rows() {
    let store = MemoryStore::new(MemoryData {
      guardians: vec![guardian("g1", "alice"), guardian("g2", "bob")],
      ..Default::default()
    });
    assert!(!store.delete_guardian("alice", "g2").await.unwrap());
    assert!(store.delete_guardian("bob", "g2").await.unwrap());
    assert_eq!(store.list_guardians("alice").await.unwrap().len(), 1);
    assert!(store.list_guardians("bob").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn grading_missing_row_is_reported() {
    let store = MemoryStore::new(MemoryData::default());
    let now = Utc::now();
    let patch = GradePatch { score: 1.0, feedback: None, status: SubmissionStatus::Graded, graded_at: now, updated_at: now };
    let err = store.grade_submission("nope", &patch).await.unwrap_err();
    assert!(matches!(err, StoreError::Missing(_)));
  }
}
