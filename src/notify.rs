//! Guardian notifications: resolve a graded submission to its student's
//! guardians and send them one message with the result.

use tracing::{info, instrument, warn};

use crate::config::EmailCfg;
use crate::domain::{Submission, SubmissionStatus};
use crate::error::{AppError, AppResult};
use crate::mailer::{EmailMessage, Mailer};
use crate::protocol::NotifyIn;
use crate::store::DataStore;
use crate::util::{escape_html, fill_template, fmt_score};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyKind {
  Assignment,
  Test,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotifyRequest {
  pub kind: NotifyKind,
  pub id: String,
}

impl NotifyIn {
  pub fn validate(self) -> AppResult<NotifyRequest> {
    let kind = self.kind.map(|k| k.trim().to_ascii_lowercase()).filter(|k| !k.is_empty());
    let id = self.id.map(|i| i.trim().to_string()).filter(|i| !i.is_empty());
    let (Some(kind), Some(id)) = (kind, id) else {
      return Err(AppError::Validation("type and id are required".into()));
    };
    let kind = match kind.as_str() {
      "assignment" => NotifyKind::Assignment,
      "test" => NotifyKind::Test,
      other => return Err(AppError::Validation(format!("Unknown notification type '{other}'"))),
    };
    Ok(NotifyRequest { kind, id })
  }
}

/// `"18 / 20 — Great work"` once graded, `"Not yet graded. Note: …"` before.
pub fn score_text(s: &Submission) -> String {
  let feedback = s.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty());
  match (s.status, s.score) {
    (SubmissionStatus::Graded, Some(score)) => {
      let mut out = format!("{} / {}", fmt_score(score), s.max_score);
      if let Some(f) = feedback {
        out.push_str(" — ");
        out.push_str(f);
      }
      out
    }
    _ => match feedback {
      Some(f) => format!("Not yet graded. Note: {f}"),
      None => "Not yet graded.".into(),
    },
  }
}

/// Guardian emails, trimmed, without blanks or case-insensitive duplicates.
fn recipients<'a, I: IntoIterator<Item = &'a str>>(emails: I) -> Vec<String> {
  let mut out: Vec<String> = vec![];
  for e in emails.into_iter().map(str::trim).filter(|e| !e.is_empty()) {
    if !out.iter().any(|o| o.eq_ignore_ascii_case(e)) {
      out.push(e.to_string());
    }
  }
  out
}

/// Dispatch a result notification. Returns the addresses the message went to.
#[instrument(level = "info", skip(store, mailer, email), fields(kind = ?req.kind, id = %req.id))]
pub async fn dispatch(
  store: &dyn DataStore,
  mailer: Option<&dyn Mailer>,
  email: &EmailCfg,
  req: NotifyRequest,
) -> AppResult<Vec<String>> {
  if req.kind == NotifyKind::Test {
    return Err(AppError::NotImplemented("Test result notifications are not supported yet".into()));
  }

  let submission = store
    .get_submission(&req.id)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;
  let assignment = store
    .get_assignment(&submission.assignment_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
  let student_name = store
    .get_profile(&submission.student_id)
    .await?
    .map(|p| p.full_name)
    .filter(|n| !n.trim().is_empty())
    .unwrap_or_else(|| "Your student".into());

  let guardians = store.list_guardians(&submission.student_id).await?;
  let to = recipients(guardians.iter().map(|g| g.email.as_str()));
  if to.is_empty() {
    return Err(AppError::Validation("No guardian email on file for this student".into()));
  }

  let score = score_text(&submission);
  let Some(mailer) = mailer else {
    warn!(target: "notify", "Email sending requested but RESEND_API_KEY is not set");
    return Err(AppError::Configuration(
      "Email sending is not configured: set RESEND_API_KEY (and optionally EMAIL_FROM) on the server".into(),
    ));
  };

  let subject = fill_template(
    &email.subject_template,
    &[("student", student_name.as_str()), ("assignment", assignment.title.as_str()), ("score", score.as_str())],
  );
  let (student_html, title_html, score_html) = (escape_html(&student_name), escape_html(&assignment.title), escape_html(&score));
  let html = fill_template(
    &email.body_template,
    &[("student", student_html.as_str()), ("assignment", title_html.as_str()), ("score", score_html.as_str())],
  );
  let message = EmailMessage { from: email.from.clone(), to: to.clone(), subject, html };
  mailer.send(&message).await?;

  info!(target: "notify", submission_id = %submission.id, recipients = to.len(), "Guardian notification sent");
  Ok(to)
}
