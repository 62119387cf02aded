//! Error taxonomy shared by all handlers, plus the lower-level store/mail errors
//! that fold into it.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Structured error body returned by every endpoint on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub code: &'static str,
  pub message: String,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
  #[error("validation failed: {0}")]
  Validation(String),
  #[error("authentication required")]
  Authentication,
  #[error("insufficient permissions: {0}")]
  Authorization(String),
  #[error("not found: {0}")]
  NotFound(String),
  /// Operator-correctable; the message is shown verbatim.
  #[error("not configured: {0}")]
  Configuration(String),
  /// The data store or email provider failed. `hint` is surfaced to the caller,
  /// `message` is only logged.
  #[error("dependency failed: {message}")]
  Dependency { message: String, hint: Option<String> },
  #[error("not implemented: {0}")]
  NotImplemented(String),
}

impl AppError {
  pub fn dependency(message: impl Into<String>) -> Self {
    AppError::Dependency { message: message.into(), hint: None }
  }

  fn status_and_body(self) -> (StatusCode, ErrorBody) {
    match self {
      AppError::Validation(msg) => (
        StatusCode::BAD_REQUEST,
        ErrorBody { code: "VALIDATION_ERROR", message: msg },
      ),
      AppError::Authentication => (
        StatusCode::UNAUTHORIZED,
        ErrorBody { code: "UNAUTHENTICATED", message: "Authentication required".into() },
      ),
      AppError::Authorization(msg) => (
        StatusCode::FORBIDDEN,
        ErrorBody { code: "FORBIDDEN", message: msg },
      ),
      AppError::NotFound(msg) => (
        StatusCode::NOT_FOUND,
        ErrorBody { code: "NOT_FOUND", message: msg },
      ),
      AppError::Configuration(msg) => {
        error!(target: "classroom_backend", detail = %msg, "Missing configuration");
        (
          StatusCode::SERVICE_UNAVAILABLE,
          ErrorBody { code: "NOT_CONFIGURED", message: msg },
        )
      }
      AppError::Dependency { message, hint } => {
        error!(target: "classroom_backend", detail = %message, "Dependency failure");
        let message = match hint {
          Some(h) => format!("An upstream service failed. Hint: {h}"),
          None => "An upstream service failed".into(),
        };
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          ErrorBody { code: "DEPENDENCY_ERROR", message },
        )
      }
      AppError::NotImplemented(msg) => (
        StatusCode::NOT_IMPLEMENTED,
        ErrorBody { code: "NOT_IMPLEMENTED", message: msg },
      ),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, body) = self.status_and_body();
    (status, Json(body)).into_response()
  }
}

/// Failures talking to the backend-as-a-service (or the in-memory stand-in).
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("backend credential {0} is not set")]
  MissingCredential(&'static str),
  #[error("backend HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("backend transport error: {0}")]
  Transport(String),
  #[error("backend response could not be decoded: {0}")]
  Decode(String),
  #[error("row not found: {0}")]
  Missing(String),
}

impl From<reqwest::Error> for StoreError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() { StoreError::Decode(e.to_string()) } else { StoreError::Transport(e.to_string()) }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::MissingCredential(var) => AppError::Dependency {
        message: format!("backend credential {var} is not set"),
        hint: Some(format!("set {var} on the server")),
      },
      StoreError::Missing(what) => AppError::NotFound(what),
      other => AppError::dependency(other.to_string()),
    }
  }
}

/// Failures from the transactional email provider.
#[derive(Debug, Error)]
pub enum MailError {
  #[error("email provider HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("email transport error: {0}")]
  Transport(String),
}

impl From<reqwest::Error> for MailError {
  fn from(e: reqwest::Error) -> Self { MailError::Transport(e.to_string()) }
}

impl From<MailError> for AppError {
  fn from(err: MailError) -> Self { AppError::dependency(err.to_string()) }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_taxonomy() {
    let cases = [
      (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
      (AppError::Authentication, StatusCode::UNAUTHORIZED),
      (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
      (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
      (AppError::Configuration("x".into()), StatusCode::SERVICE_UNAVAILABLE),
      (AppError::dependency("x"), StatusCode::INTERNAL_SERVER_ERROR),
      (AppError::NotImplemented("x".into()), StatusCode::NOT_IMPLEMENTED),
    ];
    for (err, expected) in cases {
      assert_eq!(err.status_and_body().0, expected);
    }
  }

  #[test]
  fn dependency_detail_is_sanitized_but_hint_survives() {
    let (_, body) = AppError::dependency("postgres exploded at row 7").status_and_body();
    assert!(!body.message.contains("postgres"));

    let err: AppError = StoreError::MissingCredential("BACKEND_SERVICE_ROLE_KEY").into();
    let (status, body) = err.status_and_body();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.message.contains("BACKEND_SERVICE_ROLE_KEY"));
  }
}
