//! Class analytics: a read-only projection over enrollments, submissions,
//! test attempts, lesson completions and study sessions.
//!
//! All rates and averages are percentages in 0..=100, rounded to two decimals.
//! Scores are normalized (`score / max_score * 100`) before averaging, and the
//! overall average pools every graded item rather than averaging the averages.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::*;
use crate::store::{DataStore, StoreResult};
use crate::util::{mean, percent, round2};

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct CompletionRates {
  pub lessons: f64,
  pub assignments: f64,
  pub tests: f64,
  pub on_time: f64,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct AverageScores {
  pub overall: f64,
  pub assignments: f64,
  pub tests: f64,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Engagement {
  pub daily_active_users: u64,
  pub weekly_active_users: u64,
  pub avg_session_minutes: f64,
  /// Sessions in the last 7 days per active student.
  pub login_frequency: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StudentProgress {
  pub student_id: String,
  pub student_name: String,
  pub lessons_completed: u64,
  pub total_lessons: u64,
  pub assignment_completion_rate: f64,
  pub average_score: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ContentPerformance {
  pub lesson_id: String,
  pub title: String,
  pub completion_count: u64,
  pub average_score: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClassAnalytics {
  pub class_id: String,
  pub generated_at: DateTime<Utc>,
  pub completion: CompletionRates,
  pub scores: AverageScores,
  pub engagement: Engagement,
  pub students: Vec<StudentProgress>,
  /// Sorted by `completion_count` descending, then title.
  pub content: Vec<ContentPerformance>,
}

impl ClassAnalytics {
  /// Zeroed report for a class with nothing to aggregate.
  pub fn placeholder(class_id: &str, now: DateTime<Utc>) -> Self {
    Self {
      class_id: class_id.to_string(),
      generated_at: now,
      completion: CompletionRates::default(),
      scores: AverageScores::default(),
      engagement: Engagement::default(),
      students: vec![],
      content: vec![],
    }
  }

  pub fn most_completed(&self, n: usize) -> Vec<ContentPerformance> {
    self.content.iter().take(n).cloned().collect()
  }

  /// Least completed first.
  pub fn least_completed(&self, n: usize) -> Vec<ContentPerformance> {
    self.content.iter().rev().take(n).cloned().collect()
  }
}

/// Everything the report is computed from, already scoped to one class.
#[derive(Clone, Debug, Default)]
pub struct ClassInputs {
  pub enrollments: Vec<Enrollment>,
  pub profiles: Vec<Profile>,
  pub assignments: Vec<Assignment>,
  pub submissions: Vec<Submission>,
  pub tests: Vec<Test>,
  pub attempts: Vec<TestAttempt>,
  pub lessons: Vec<Lesson>,
  pub lesson_completions: Vec<LessonCompletion>,
  pub sessions: Vec<StudySession>,
}

fn pct_of(score: f64, max: u32) -> Option<f64> {
  (max > 0).then(|| score / f64::from(max) * 100.0)
}

/// Pure projection of `inputs` into a report.
pub fn build_report(class_id: &str, inputs: &ClassInputs, now: DateTime<Utc>) -> ClassAnalytics {
  let active: HashSet<&str> = inputs
    .enrollments
    .iter()
    .filter(|e| e.status == EnrollmentStatus::Active)
    .map(|e| e.student_id.as_str())
    .collect();
  if active.is_empty() {
    return ClassAnalytics::placeholder(class_id, now);
  }
  let students = active.len() as f64;

  // Assignments: one counted submission per (assignment, student).
  let due: HashMap<&str, Option<DateTime<Utc>>> = inputs.assignments.iter().map(|a| (a.id.as_str(), a.due_date)).collect();
  let mut turned_in: HashSet<(&str, &str)> = HashSet::new();
  let mut on_time = 0u64;
  let mut assignment_pcts: Vec<f64> = vec![];
  let mut per_student_pcts: HashMap<&str, Vec<f64>> = HashMap::new();
  for s in &inputs.submissions {
    let Some(due_date) = due.get(s.assignment_id.as_str()) else { continue };
    if !active.contains(s.student_id.as_str()) || s.status == SubmissionStatus::Draft {
      continue;
    }
    if turned_in.insert((s.assignment_id.as_str(), s.student_id.as_str())) {
      if due_date.map_or(true, |d| s.effective_submitted_at() <= d) {
        on_time += 1;
      }
    }
    if s.status == SubmissionStatus::Graded {
      if let Some(p) = s.score.and_then(|sc| pct_of(sc, s.max_score)) {
        assignment_pcts.push(p);
        per_student_pcts.entry(s.student_id.as_str()).or_default().push(p);
      }
    }
  }

  // Tests.
  let test_max: HashMap<&str, u32> = inputs.tests.iter().map(|t| (t.id.as_str(), t.max_score)).collect();
  let mut tests_done: HashSet<(&str, &str)> = HashSet::new();
  let mut test_pcts: Vec<f64> = vec![];
  for a in &inputs.attempts {
    let Some(max) = test_max.get(a.test_id.as_str()) else { continue };
    if !active.contains(a.student_id.as_str()) {
      continue;
    }
    if matches!(a.status, AttemptStatus::Submitted | AttemptStatus::Graded) {
      tests_done.insert((a.test_id.as_str(), a.student_id.as_str()));
    }
    if a.status == AttemptStatus::Graded {
      if let Some(p) = a.score.and_then(|sc| pct_of(sc, *max)) {
        test_pcts.push(p);
        per_student_pcts.entry(a.student_id.as_str()).or_default().push(p);
      }
    }
  }

  // Lessons.
  let lesson_ids: HashSet<&str> = inputs.lessons.iter().map(|l| l.id.as_str()).collect();
  let mut lesson_done: HashSet<(&str, &str)> = HashSet::new();
  let mut lesson_scores: HashMap<&str, Vec<f64>> = HashMap::new();
  for c in &inputs.lesson_completions {
    if !lesson_ids.contains(c.lesson_id.as_str()) || !active.contains(c.student_id.as_str()) {
      continue;
    }
    if lesson_done.insert((c.lesson_id.as_str(), c.student_id.as_str())) {
      if let Some(sc) = c.score {
        lesson_scores.entry(c.lesson_id.as_str()).or_default().push(sc);
      }
    }
  }

  let n_assignments = inputs.assignments.len() as f64;
  let n_tests = inputs.tests.len() as f64;
  let n_lessons = inputs.lessons.len() as f64;

  let completion = CompletionRates {
    lessons: percent(lesson_done.len() as f64, n_lessons * students),
    assignments: percent(turned_in.len() as f64, n_assignments * students),
    tests: percent(tests_done.len() as f64, n_tests * students),
    on_time: percent(on_time as f64, turned_in.len() as f64),
  };

  let all_pcts: Vec<f64> = assignment_pcts.iter().chain(test_pcts.iter()).copied().collect();
  let scores = AverageScores {
    overall: round2(mean(&all_pcts)),
    assignments: round2(mean(&assignment_pcts)),
    tests: round2(mean(&test_pcts)),
  };

  let engagement = engagement(&inputs.sessions, &active, now);

  let names: HashMap<&str, &str> = inputs.profiles.iter().map(|p| (p.id.as_str(), p.full_name.as_str())).collect();
  let mut student_rows: Vec<StudentProgress> = active
    .iter()
    .map(|sid| {
      let lessons_completed = lesson_done.iter().filter(|(_, s)| s == sid).count() as u64;
      let turned = turned_in.iter().filter(|(_, s)| s == sid).count() as f64;
      StudentProgress {
        student_id: sid.to_string(),
        student_name: names.get(sid).copied().unwrap_or_default().to_string(),
        lessons_completed,
        total_lessons: inputs.lessons.len() as u64,
        assignment_completion_rate: percent(turned, n_assignments),
        average_score: round2(per_student_pcts.get(sid).map(|v| mean(v)).unwrap_or(0.0)),
      }
    })
    .collect();
  student_rows.sort_by(|a, b| a.student_name.cmp(&b.student_name).then_with(|| a.student_id.cmp(&b.student_id)));

  let mut content: Vec<ContentPerformance> = inputs
    .lessons
    .iter()
    .map(|l| ContentPerformance {
      lesson_id: l.id.clone(),
      title: l.title.clone(),
      completion_count: lesson_done.iter().filter(|(lid, _)| *lid == l.id.as_str()).count() as u64,
      average_score: round2(lesson_scores.get(l.id.as_str()).map(|v| mean(v)).unwrap_or(0.0)),
    })
    .collect();
  content.sort_by(|a, b| b.completion_count.cmp(&a.completion_count).then_with(|| a.title.cmp(&b.title)));

  ClassAnalytics {
    class_id: class_id.to_string(),
    generated_at: now,
    completion,
    scores,
    engagement,
    students: student_rows,
    content,
  }
}

fn engagement(sessions: &[StudySession], active: &HashSet<&str>, now: DateTime<Utc>) -> Engagement {
  let day_ago = now - Duration::days(1);
  let week_ago = now - Duration::days(7);
  let relevant: Vec<&StudySession> = sessions
    .iter()
    .filter(|s| active.contains(s.student_id.as_str()) && s.started_at <= now)
    .collect();

  let daily: HashSet<&str> = relevant.iter().filter(|s| s.started_at > day_ago).map(|s| s.student_id.as_str()).collect();
  let weekly: Vec<&&StudySession> = relevant.iter().filter(|s| s.started_at > week_ago).collect();
  let weekly_users: HashSet<&str> = weekly.iter().map(|s| s.student_id.as_str()).collect();
  let minutes: Vec<f64> = relevant.iter().map(|s| s.duration_minutes).collect();

  Engagement {
    daily_active_users: daily.len() as u64,
    weekly_active_users: weekly_users.len() as u64,
    avg_session_minutes: round2(mean(&minutes)),
    login_frequency: if active.is_empty() { 0.0 } else { round2(weekly.len() as f64 / active.len() as f64) },
  }
}

/// Gather a class's data from the store and build its report.
#[instrument(level = "info", skip(store))]
pub async fn class_analytics(store: &dyn DataStore, class_id: &str, now: DateTime<Utc>) -> StoreResult<ClassAnalytics> {
  let enrollments = store.list_enrollments(class_id).await?;
  if !enrollments.iter().any(|e| e.status == EnrollmentStatus::Active) {
    debug!(target: "analytics", %class_id, "No active enrollments; returning placeholder");
    return Ok(ClassAnalytics::placeholder(class_id, now));
  }

  let student_ids: Vec<String> = enrollments.iter().map(|e| e.student_id.clone()).collect();
  let assignments = store.list_assignments_for_class(class_id).await?;
  let assignment_ids: Vec<String> = assignments.iter().map(|a| a.id.clone()).collect();
  let tests = store.list_tests_for_class(class_id).await?;
  let test_ids: Vec<String> = tests.iter().map(|t| t.id.clone()).collect();
  let lessons = store.list_lessons_for_class(class_id).await?;
  let lesson_ids: Vec<String> = lessons.iter().map(|l| l.id.clone()).collect();

  let inputs = ClassInputs {
    profiles: store.list_profiles(&student_ids).await?,
    submissions: store.list_submissions(&assignment_ids).await?,
    attempts: store.list_attempts(&test_ids).await?,
    lesson_completions: store.list_lesson_completions(&lesson_ids).await?,
    sessions: store.list_study_sessions(class_id).await?,
    enrollments,
    assignments,
    tests,
    lessons,
  };
  let report = build_report(class_id, &inputs, now);
  debug!(target: "analytics", %class_id, students = report.students.len(), lessons = report.content.len(), "Class analytics built");
  Ok(report)
}
