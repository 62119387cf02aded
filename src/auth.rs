//! Request extractors: the authenticated caller, and JSON / path / query
//! wrappers that report rejections as validation errors.

use std::sync::Arc;

use axum::{
  async_trait,
  extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request},
  http::{header::AUTHORIZATION, request::Parts},
  Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::Role;
use crate::error::AppError;
use crate::state::AppState;

/// Caller resolved from `Authorization: Bearer <token>`.
///
/// Handlers that must report body errors before auth errors take
/// `Result<AuthUser, AppError>` and apply `?` themselves.
#[derive(Clone, Debug)]
pub struct AuthUser {
  pub user_id: String,
  pub role: Role,
  pub full_name: String,
  pub email: Option<String>,
}

impl AuthUser {
  pub fn require_teacher(&self) -> Result<(), AppError> {
    match self.role {
      Role::Teacher => Ok(()),
      _ => Err(AppError::Authorization("Teacher role required".into())),
    }
  }

  pub fn require_student(&self) -> Result<(), AppError> {
    match self.role {
      Role::Student => Ok(()),
      _ => Err(AppError::Authorization("Student role required".into())),
    }
  }
}

fn bearer(parts: &Parts) -> Option<&str> {
  parts
    .headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let token = bearer(parts).ok_or(AppError::Authentication)?;
    let user_id = state
      .sessions
      .resolve_token(token)
      .await?
      .ok_or(AppError::Authentication)?;

    // A session without a profile row has no role and fails every role check.
    let user = match state.store.get_profile(&user_id).await? {
      Some(p) => AuthUser { user_id, role: p.role, full_name: p.full_name, email: p.email },
      None => AuthUser { user_id, role: Role::Other, full_name: String::new(), email: None },
    };
    debug!(target: "classroom_backend", user_id = %user.user_id, role = ?user.role, "Caller resolved");
    Ok(user)
  }
}

/// A `Json<T>` wrapper that converts deserialization errors into `AppError::Validation`.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
  Json<T>: FromRequest<S, Rejection = JsonRejection>,
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = AppError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state)
      .await
      .map_err(|e| AppError::Validation(e.body_text()))?;
    Ok(AppJson(value))
  }
}

/// `Path<T>` with rejections reported as `AppError::Validation`.
#[derive(Debug)]
pub struct AppPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(value) = Path::<T>::from_request_parts(parts, state)
      .await
      .map_err(|e| AppError::Validation(e.body_text()))?;
    Ok(AppPath(value))
  }
}

/// `Query<T>` with rejections reported as `AppError::Validation`.
#[derive(Debug)]
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Query(value) = Query::<T>::from_request_parts(parts, state)
      .await
      .map_err(|e| AppError::Validation(e.body_text()))?;
    Ok(AppQuery(value))
  }
}
