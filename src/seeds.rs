//! Demo data for running without a backend.
//!
//! Guarantees the app is explorable locally: one class, a teacher and two
//! students with fixed bearer tokens, an essay assignment, a quiz and lessons.

use chrono::{Duration, Utc};

use crate::domain::*;
use crate::store::MemoryData;

pub const DEMO_TEACHER_TOKEN: &str = "demo-teacher-token";
pub const DEMO_STUDENT_TOKEN: &str = "demo-student-token";

pub fn demo_data() -> MemoryData {
  let now = Utc::now();
  let class_id = "demo-class".to_string();

  let submission = |id: &str, student: &str, status: SubmissionStatus, days_ago: i64| Submission {
    id: id.into(),
    student_id: student.into(),
    assignment_id: "demo-essay".into(),
    answers: serde_json::json!({ "text": "Hier ist mein Aufsatz." }),
    status,
    score: None,
    max_score: 20,
    feedback: None,
    created_at: now - Duration::days(days_ago),
    submitted_at: Some(now - Duration::days(days_ago)),
    graded_at: None,
    updated_at: None,
  };

  MemoryData {
    submissions: vec![
      submission("demo-sub-1", "demo-student-1", SubmissionStatus::Submitted, 2),
      submission("demo-sub-2", "demo-student-2", SubmissionStatus::Draft, 1),
    ],
    assignments: vec![Assignment {
      id: "demo-essay".into(),
      title: "Essay: Mein Wochenende".into(),
      class_id: Some(class_id.clone()),
      teacher_id: Some("demo-teacher".into()),
      due_date: Some(now + Duration::days(3)),
      submission_count: 0,
      completion_rate: 0.0,
    }],
    enrollments: ["demo-student-1", "demo-student-2"]
      .iter()
      .map(|s| Enrollment { class_id: class_id.clone(), student_id: s.to_string(), status: EnrollmentStatus::Active })
      .collect(),
    profiles: vec![
      Profile { id: "demo-teacher".into(), full_name: "Demo Teacher".into(), email: Some("teacher@demo.local".into()), role: Role::Teacher },
      Profile { id: "demo-student-1".into(), full_name: "Alex Demo".into(), email: None, role: Role::Student },
      Profile { id: "demo-student-2".into(), full_name: "Sam Demo".into(), email: None, role: Role::Student },
    ],
    guardians: vec![Guardian {
      id: "demo-guardian-1".into(),
      student_id: "demo-student-1".into(),
      email: "guardian@demo.local".into(),
      phone: None,
      relationship: Some("parent".into()),
    }],
    tests: vec![Test {
      id: "demo-quiz".into(),
      title: "Vocabulary quiz 1".into(),
      class_id: Some(class_id.clone()),
      status: None,
      start_date: now - Duration::hours(1),
      end_date: now + Duration::hours(1),
      max_score: 50,
    }],
    attempts: vec![TestAttempt {
      id: "demo-attempt-1".into(),
      test_id: "demo-quiz".into(),
      student_id: "demo-student-1".into(),
      status: AttemptStatus::InProgress,
      score: None,
      started_at: Some(now - Duration::minutes(20)),
      submitted_at: None,
    }],
    lessons: vec![
      Lesson { id: "demo-lesson-1".into(), class_id: class_id.clone(), title: "Begrüßungen".into() },
      Lesson { id: "demo-lesson-2".into(), class_id: class_id.clone(), title: "Zahlen".into() },
    ],
    lesson_completions: vec![LessonCompletion {
      lesson_id: "demo-lesson-1".into(),
      student_id: "demo-student-1".into(),
      completed_at: now - Duration::days(1),
      score: Some(85.0),
    }],
    sessions: vec![StudySession {
      student_id: "demo-student-1".into(),
      class_id,
      started_at: now - Duration::hours(3),
      duration_minutes: 25.0,
    }],
    tokens: vec![
      (DEMO_TEACHER_TOKEN.into(), "demo-teacher".into()),
      (DEMO_STUDENT_TOKEN.into(), "demo-student-1".into()),
    ],
  }
}
