//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.
//!
//! Handlers with a JSON body take the caller as `Result<AuthUser, AppError>` so
//! malformed bodies are reported before authentication problems.

use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::analytics::class_analytics;
use crate::auth::{AppJson, AppPath, AppQuery, AuthUser};
use crate::completion::recalculate;
use crate::domain::{Guardian, Role};
use crate::error::{AppError, AppResult};
use crate::grading::grade_submission;
use crate::notify::dispatch;
use crate::protocol::*;
use crate::state::AppState;
use crate::test_status::{monitoring_rows, test_status};
use crate::util::looks_like_email;

const DEFAULT_TOP: usize = 5;
const DEFAULT_BOTTOM: usize = 3;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip_all)]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  auth: Result<AuthUser, AppError>,
  AppJson(body): AppJson<GradeIn>,
) -> AppResult<Json<SubmissionView>> {
  let req = body.validate()?;
  let user = auth?;
  user.require_teacher()?;

  let graded = grade_submission(state.store.as_ref(), req, Utc::now()).await?;
  state.recalc.schedule(&graded.assignment_id);
  info!(target: "grading", id = %graded.id, teacher = %user.user_id, "HTTP grade applied");
  Ok(Json(to_view(&graded)))
}

#[instrument(level = "info", skip_all)]
pub async fn http_post_notify(
  State(state): State<Arc<AppState>>,
  auth: Result<AuthUser, AppError>,
  AppJson(body): AppJson<NotifyIn>,
) -> AppResult<Json<NotifyOut>> {
  let req = body.validate()?;
  let user = auth?;
  user.require_teacher()?;

  let sent_to = dispatch(state.store.as_ref(), state.mailer.as_deref(), &state.email, req).await?;
  info!(target: "notify", teacher = %user.user_id, recipients = sent_to.len(), "HTTP notification dispatched");
  Ok(Json(NotifyOut { success: true, sent_to }))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_get_submission(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<Json<SubmissionView>> {
  let s = state
    .store
    .get_submission(&id)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;
  let is_owner = user.role == Role::Student && s.student_id == user.user_id;
  if !is_owner {
    user.require_teacher()?;
  }
  Ok(Json(to_view(&s)))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_get_assignment_submissions(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<Json<Vec<SubmissionView>>> {
  user.require_teacher()?;
  state
    .store
    .get_assignment(&id)
    .await?
    .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
  let subs = state.store.list_submissions(std::slice::from_ref(&id)).await?;
  Ok(Json(subs.iter().map(to_view).collect()))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_post_recalculate(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<Json<RecalcOut>> {
  user.require_teacher()?;
  state
    .store
    .get_assignment(&id)
    .await?
    .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
  let metrics = recalculate(state.store.as_ref(), &id).await?;
  info!(target: "grading", assignment_id = %id, updated = metrics.is_some(), "HTTP recalculation");
  Ok(Json(RecalcOut {
    assignment_id: id,
    updated: metrics.is_some(),
    submission_count: metrics.map(|m| m.submission_count),
    completion_rate: metrics.map(|m| m.completion_rate),
  }))
}

#[instrument(level = "info", skip(state, _user))]
pub async fn http_get_test_status(
  State(state): State<Arc<AppState>>,
  _user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<Json<TestStatusOut>> {
  let test = state.store.get_test(&id).await?.ok_or_else(|| AppError::NotFound("Test not found".into()))?;
  Ok(Json(TestStatusOut {
    status: test_status(&test, Utc::now()),
    test_id: test.id,
    start_date: test.start_date,
    end_date: test.end_date,
  }))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_get_test_attempts(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<Json<Vec<AttemptRow>>> {
  user.require_teacher()?;
  let test = state.store.get_test(&id).await?.ok_or_else(|| AppError::NotFound("Test not found".into()))?;
  let Some(class_id) = test.class_id.as_deref() else {
    return Ok(Json(vec![]));
  };
  let enrollments = state.store.list_enrollments(class_id).await?;
  let student_ids: Vec<String> = enrollments.iter().map(|e| e.student_id.clone()).collect();
  let profiles = state.store.list_profiles(&student_ids).await?;
  let attempts = state.store.list_attempts(std::slice::from_ref(&test.id)).await?;
  Ok(Json(monitoring_rows(&enrollments, &profiles, &attempts)))
}

#[instrument(level = "info", skip(state, user, q), fields(caller = %user.user_id))]
pub async fn http_get_class_analytics(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
  AppQuery(q): AppQuery<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsOut>> {
  user.require_teacher()?;
  let report = class_analytics(state.store.as_ref(), &id, Utc::now()).await?;
  let most_completed = report.most_completed(q.top.unwrap_or(DEFAULT_TOP));
  let least_completed = report.least_completed(q.bottom.unwrap_or(DEFAULT_BOTTOM));
  info!(target: "analytics", class_id = %id, students = report.students.len(), "HTTP class analytics served");
  Ok(Json(AnalyticsOut { report, most_completed, least_completed }))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_get_guardians(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
) -> AppResult<Json<Vec<Guardian>>> {
  user.require_student()?;
  Ok(Json(state.store.list_guardians(&user.user_id).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_post_guardian(
  State(state): State<Arc<AppState>>,
  auth: Result<AuthUser, AppError>,
  AppJson(body): AppJson<GuardianIn>,
) -> AppResult<(StatusCode, Json<Guardian>)> {
  let email = body.email.trim().to_string();
  if !looks_like_email(&email) {
    return Err(AppError::Validation("A valid guardian email is required".into()));
  }
  let user = auth?;
  user.require_student()?;

  let guardian = Guardian {
    id: Uuid::new_v4().to_string(),
    student_id: user.user_id.clone(),
    email,
    phone: body.phone.filter(|p| !p.trim().is_empty()),
    relationship: body.relationship.filter(|r| !r.trim().is_empty()),
  };
  let saved = state.store.insert_guardian(&guardian).await?;
  info!(target: "classroom_backend", student = %user.user_id, guardian = %saved.id, "Guardian added");
  Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(level = "info", skip(state, user), fields(caller = %user.user_id))]
pub async fn http_delete_guardian(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  AppPath(id): AppPath<String>,
) -> AppResult<StatusCode> {
  user.require_student()?;
  if !state.store.delete_guardian(&user.user_id, &id).await? {
    return Err(AppError::NotFound("Guardian not found".into()));
  }
  info!(target: "classroom_backend", student = %user.user_id, guardian = %id, "Guardian removed");
  Ok(StatusCode::NO_CONTENT)
}
