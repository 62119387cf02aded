//! Effective status of a timed test, and the attempt-monitoring projection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
  AttemptStatus, EffectiveTestStatus, Enrollment, EnrollmentStatus, Profile, Test, TestAdminStatus, TestAttempt,
};
use crate::protocol::AttemptRow;

/// `draft` / `closed` win outright; otherwise the date window decides.
/// Both window bounds are inclusive for `active`.
pub fn effective_status(
  admin: Option<TestAdminStatus>,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  now: DateTime<Utc>,
) -> EffectiveTestStatus {
  match admin {
    Some(TestAdminStatus::Draft) => EffectiveTestStatus::Draft,
    Some(TestAdminStatus::Closed) => EffectiveTestStatus::Closed,
    _ if now < start => EffectiveTestStatus::Scheduled,
    _ if now <= end => EffectiveTestStatus::Active,
    _ => EffectiveTestStatus::Completed,
  }
}

pub fn test_status(test: &Test, now: DateTime<Utc>) -> EffectiveTestStatus {
  effective_status(test.status, test.start_date, test.end_date, now)
}

/// One row per active enrollee. Students without an attempt are shown as
/// `not_started`; nothing is persisted. Rows are ordered by student name.
///
/// With several attempts per student the most recently started one is shown;
/// on equal start times the earlier row in `attempts` wins.
pub fn monitoring_rows(enrollments: &[Enrollment], profiles: &[Profile], attempts: &[TestAttempt]) -> Vec<AttemptRow> {
  let names: HashMap<&str, &str> = profiles.iter().map(|p| (p.id.as_str(), p.full_name.as_str())).collect();
  let mut by_student: HashMap<&str, &TestAttempt> = HashMap::new();
  for a in attempts {
    by_student
      .entry(a.student_id.as_str())
      .and_modify(|cur| {
        if a.started_at > cur.started_at {
          *cur = a;
        }
      })
      .or_insert(a);
  }

  let mut rows: Vec<AttemptRow> = enrollments
    .iter()
    .filter(|e| e.status == EnrollmentStatus::Active)
    .map(|e| {
      let student_name = names.get(e.student_id.as_str()).copied().unwrap_or_default().to_string();
      match by_student.get(e.student_id.as_str()) {
        Some(a) => AttemptRow {
          student_id: e.student_id.clone(),
          student_name,
          status: a.status,
          score: a.score,
          started_at: a.started_at,
          submitted_at: a.submitted_at,
        },
        None => AttemptRow {
          student_id: e.student_id.clone(),
          student_name,
          status: AttemptStatus::NotStarted,
          score: None,
          started_at: None,
          submitted_at: None,
        },
      }
    })
    .collect();
  rows.sort_by(|a, b| a.student_name.cmp(&b.student_name).then_with(|| a.student_id.cmp(&b.student_id)));
  rows.dedup_by(|a, b| a.student_id == b.student_id);
  rows
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::testutil::{at, profile};

  #[test]
  fn closed_and_draft_override_dates() {
    for now in [at(1, 0), at(15, 0), at(30, 0)] {
      assert_eq!(effective_status(Some(TestAdminStatus::Closed), at(10, 0), at(20, 0), now), EffectiveTestStatus::Closed);
      assert_eq!(effective_status(Some(TestAdminStatus::Draft), at(10, 0), at(20, 0), now), EffectiveTestStatus::Draft);
    }
  }

  #[test]
  fn date_window_drives_status() {
    let (start, end) = (at(10, 0), at(20, 0));
    assert_eq!(effective_status(None, start, end, at(9, 0)), EffectiveTestStatus::Scheduled);
    assert_eq!(effective_status(None, start, end, start), EffectiveTestStatus::Active);
    assert_eq!(effective_status(Some(TestAdminStatus::Published), start, end, at(15, 0)), EffectiveTestStatus::Active);
    assert_eq!(effective_status(None, start, end, end), EffectiveTestStatus::Active);
    assert_eq!(effective_status(None, start, end, at(21, 0)), EffectiveTestStatus::Completed);
  }

  #[test]
  fn missing_attempts_synthesized_as_not_started() {
    let enrollments = vec![
      Enrollment { class_id: "c1".into(), student_id: "st2".into(), status: EnrollmentStatus::Active },
      Enrollment { class_id: "c1".into(), student_id: "st1".into(), status: EnrollmentStatus::Active },
      Enrollment { class_id: "c1".into(), student_id: "st3".into(), status: EnrollmentStatus::Inactive },
    ];
    let profiles = vec![profile("st1", "Ana Lima", Role::Student), profile("st2", "Ben Ode", Role::Student)];
    let attempts = vec![TestAttempt {
      id: "at1".into(),
      test_id: "t1".into(),
      student_id: "st2".into(),
      status: AttemptStatus::InProgress,
      score: None,
      started_at: Some(at(15, 9)),
      submitted_at: None,
    }];

    let rows = monitoring_rows(&enrollments, &profiles, &attempts);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].student_name, "Ana Lima");
    assert_eq!(rows[0].status, AttemptStatus::NotStarted);
    assert_eq!(rows[1].status, AttemptStatus::InProgress);
    assert_eq!(rows[1].started_at, Some(at(15, 9)));
  }

  #[test]
  fn latest_attempt_wins_regardless_of_row_order() {
    let enrollments = vec![Enrollment { class_id: "c1".into(), student_id: "st1".into(), status: EnrollmentStatus::Active }];
    let profiles = vec![profile("st1", "Ana Lima", Role::Student)];
    let attempt = |id: &str, status: AttemptStatus, started: Option<DateTime<Utc>>| TestAttempt {
      id: id.into(),
      test_id: "t1".into(),
      student_id: "st1".into(),
      status,
      score: None,
      started_at: started,
      submitted_at: None,
    };
    let retake = attempt("at2", AttemptStatus::InProgress, Some(at(16, 9)));
    let first = attempt("at1", AttemptStatus::Submitted, Some(at(15, 9)));
    let never = attempt("at0", AttemptStatus::NotStarted, None);

    for order in [vec![retake.clone(), first.clone(), never.clone()], vec![never, first, retake]] {
      let rows = monitoring_rows(&enrollments, &profiles, &order);
      assert_eq!(rows.len(), 1);
      assert_eq!(rows[0].status, AttemptStatus::InProgress);
      assert_eq!(rows[0].started_at, Some(at(16, 9)));
    }
  }
}
