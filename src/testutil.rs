//! Shared fixtures for unit tests: a small class with one teacher, two
//! students, one assignment and one submitted essay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::*;
use crate::error::{MailError, StoreError};
use crate::mailer::{EmailMessage, Mailer};
use crate::store::{DataStore, MemoryData, MemoryStore, StoreResult};

pub const TEACHER_TOKEN: &str = "teacher-token";
pub const STUDENT_TOKEN: &str = "student-token";

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
}

pub fn profile(id: &str, name: &str, role: Role) -> Profile {
  Profile { id: id.into(), full_name: name.into(), email: Some(format!("{id}@school.test")), role }
}

pub fn submission(id: &str, student: &str, assignment: &str, status: SubmissionStatus) -> Submission {
  Submission {
    id: id.into(),
    student_id: student.into(),
    assignment_id: assignment.into(),
    answers: serde_json::json!({ "q1": "Ich bin am Wochenende gewandert." }),
    status,
    score: None,
    max_score: 20,
    feedback: None,
    created_at: at(10, 9),
    submitted_at: None,
    graded_at: None,
    updated_at: None,
  }
}

pub fn data() -> MemoryData {
  MemoryData {
    submissions: vec![submission("s1", "st1", "a1", SubmissionStatus::Submitted)],
    assignments: vec![Assignment {
      id: "a1".into(),
      title: "Essay: My Weekend".into(),
      class_id: Some("c1".into()),
      teacher_id: Some("t1".into()),
      due_date: Some(at(12, 23)),
      submission_count: 0,
      completion_rate: 0.0,
    }],
    enrollments: vec![
      Enrollment { class_id: "c1".into(), student_id: "st1".into(), status: EnrollmentStatus::Active },
      Enrollment { class_id: "c1".into(), student_id: "st2".into(), status: EnrollmentStatus::Active },
    ],
    profiles: vec![
      profile("t1", "Frau Weber", Role::Teacher),
      profile("st1", "Ana Lima", Role::Student),
      profile("st2", "Ben Ode", Role::Student),
    ],
    guardians: vec![Guardian {
      id: "g1".into(),
      student_id: "st1".into(),
      email: "parent@example.com".into(),
      phone: None,
      relationship: Some("mother".into()),
    }],
    tokens: vec![
      (TEACHER_TOKEN.into(), "t1".into()),
      (STUDENT_TOKEN.into(), "st1".into()),
    ],
    ..Default::default()
  }
}

pub fn store() -> MemoryStore {
  MemoryStore::new(data())
}

/// Mailer that records every message, or fails every send.
#[derive(Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<EmailMessage>>,
  pub fail: bool,
}

impl RecordingMailer {
  pub fn failing() -> Self {
    Self { sent: Mutex::new(vec![]), fail: true }
  }

  pub fn messages(&self) -> Vec<EmailMessage> {
    self.sent.lock().unwrap().clone()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
    if self.fail {
      return Err(MailError::Http { status: 502, message: "provider down".into() });
    }
    self.sent.lock().unwrap().push(message.clone());
    Ok(())
  }
}

pub fn mailer() -> Arc<RecordingMailer> {
  Arc::new(RecordingMailer::default())
}

/// Store whose metric writes fail for one assignment; everything else goes to
/// the wrapped `MemoryStore`.
pub struct BrokenMetricsStore {
  pub inner: Arc<MemoryStore>,
  broken: String,
  failures: AtomicUsize,
}

impl BrokenMetricsStore {
  pub fn new(data: MemoryData, broken: &str) -> Self {
    Self { inner: Arc::new(MemoryStore::new(data)), broken: broken.into(), failures: AtomicUsize::new(0) }
  }

  pub fn failures(&self) -> usize {
    self.failures.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl DataStore for BrokenMetricsStore {
  async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> { self.inner.get_submission(id).await }
  async fn grade_submission(&self, id: &str, patch: &GradePatch) -> StoreResult<Submission> {
    self.inner.grade_submission(id, patch).await
  }
  async fn list_submissions(&self, ids: &[String]) -> StoreResult<Vec<Submission>> { self.inner.list_submissions(ids).await }
  async fn count_submissions(&self, assignment_id: &str, status: SubmissionStatus) -> StoreResult<u64> {
    self.inner.count_submissions(assignment_id, status).await
  }
  async fn get_assignment(&self, id: &str) -> StoreResult<Option<Assignment>> { self.inner.get_assignment(id).await }
  async fn list_assignments_for_class(&self, class_id: &str) -> StoreResult<Vec<Assignment>> {
    self.inner.list_assignments_for_class(class_id).await
  }
  async fn update_assignment_metrics(&self, id: &str, metrics: AssignmentMetrics) -> StoreResult<()> {
    if id == self.broken {
      self.failures.fetch_add(1, Ordering::SeqCst);
      return Err(StoreError::Http { status: 500, message: "write rejected".into() });
    }
    self.inner.update_assignment_metrics(id, metrics).await
  }
  async fn list_enrollments(&self, class_id: &str) -> StoreResult<Vec<Enrollment>> { self.inner.list_enrollments(class_id).await }
  async fn count_active_enrollments(&self, class_id: &str) -> StoreResult<u64> {
    self.inner.count_active_enrollments(class_id).await
  }
  async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> { self.inner.get_profile(id).await }
  async fn list_profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>> { self.inner.list_profiles(ids).await }
  async fn list_guardians(&self, student_id: &str) -> StoreResult<Vec<Guardian>> { self.inner.list_guardians(student_id).await }
  async fn insert_guardian(&self, guardian: &Guardian) -> StoreResult<Guardian> { self.inner.insert_guardian(guardian).await }
  async fn delete_guardian(&self, student_id: &str, guardian_id: &str) -> StoreResult<bool> {
    self.inner.delete_guardian(student_id, guardian_id).await
  }
  async fn get_test(&self, id: &str) -> StoreResult<Option<Test>> { self.inner.get_test(id).await }
  async fn list_tests_for_class(&self, class_id: &str) -> StoreResult<Vec<Test>> { self.inner.list_tests_for_class(class_id).await }
  async fn list_attempts(&self, test_ids: &[String]) -> StoreResult<Vec<TestAttempt>> { self.inner.list_attempts(test_ids).await }
  async fn list_lessons_for_class(&self, class_id: &str) -> StoreResult<Vec<Lesson>> {
    self.inner.list_lessons_for_class(class_id).await
  }
  async fn list_lesson_completions(&self, lesson_ids: &[String]) -> StoreResult<Vec<LessonCompletion>> {
    self.inner.list_lesson_completions(lesson_ids).await
  }
  async fn list_study_sessions(&self, class_id: &str) -> StoreResult<Vec<StudySession>> {
    self.inner.list_study_sessions(class_id).await
  }
}

/// `data()` plus a second assignment `a2` in class `c1` carrying a stale
/// completion rate of 99.
pub fn data_with_second_assignment() -> MemoryData {
  let mut d = data();
  d.assignments.push(Assignment {
    id: "a2".into(),
    title: "Dialogue practice".into(),
    class_id: Some("c1".into()),
    teacher_id: Some("t1".into()),
    due_date: None,
    submission_count: 0,
    completion_rate: 99.0,
  });
  d
}

