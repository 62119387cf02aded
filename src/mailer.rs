//! Outbound email: the `Mailer` seam and the transactional-provider client.
//!
//! One `EmailMessage` is one send, regardless of how many recipients it has.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::EmailCfg;
use crate::error::MailError;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EmailMessage {
  pub from: String,
  pub to: Vec<String>,
  pub subject: String,
  pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Client for a Resend-compatible `POST /emails` API.
#[derive(Clone)]
pub struct ResendMailer {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
}

impl ResendMailer {
  /// Construct the mailer if an API key is configured; otherwise return None.
  pub fn from_config(cfg: &EmailCfg) -> Option<Self> {
    let api_key = cfg.api_key.clone()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .ok()?;
    Some(Self { client, api_key, base_url: cfg.base_url.clone() })
  }
}

#[async_trait]
impl Mailer for ResendMailer {
  #[instrument(level = "info", skip_all, fields(recipients = message.to.len()))]
  async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
    #[derive(Deserialize)]
    struct Sent { #[serde(default)] id: Option<String> }

    let res = self.client.post(format!("{}/emails", self.base_url))
      .header(USER_AGENT, "classroom-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(message).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_provider_error(&body).unwrap_or(body);
      return Err(MailError::Http { status: status.as_u16(), message });
    }

    let sent: Sent = res.json().await.unwrap_or(Sent { id: None });
    info!(target: "notify", provider_id = ?sent.id, "Email accepted by provider");
    Ok(())
  }
}

fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EObj>(body).ok().map(|e| e.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mailer_absent_without_api_key() {
    assert!(ResendMailer::from_config(&EmailCfg::default()).is_none());
    let cfg = EmailCfg { api_key: Some("re_x".into()), ..EmailCfg::default() };
    assert!(ResendMailer::from_config(&cfg).is_some());
  }

  #[test]
  fn message_serializes_recipients_as_array() {
    let m = EmailMessage { from: "a@x".into(), to: vec!["p@x".into(), "q@x".into()], subject: "s".into(), html: "h".into() };
    let v = serde_json::to_value(&m).unwrap();
    assert_eq!(v["to"], serde_json::json!(["p@x", "q@x"]));
  }

  #[test]
  fn provider_error_message_extracted() {
    assert_eq!(extract_provider_error(r#"{"statusCode":422,"message":"Invalid `to`"}"#).as_deref(), Some("Invalid `to`"));
  }

  use serde_json::json;
  use wiremock::matchers::{bearer_token, body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn mailer_for(server: &MockServer) -> ResendMailer {
    let cfg = EmailCfg { api_key: Some("re_test".into()), base_url: server.uri(), ..EmailCfg::default() };
    ResendMailer::from_config(&cfg).unwrap()
  }

  fn message() -> EmailMessage {
    EmailMessage {
      from: "Classroom <notifications@classroom.local>".into(),
      to: vec!["parent@example.com".into(), "aunt@example.com".into()],
      subject: "Ana Lima: result for Essay".into(),
      html: "<p>Result: 18 / 20</p>".into(),
    }
  }

  #[tokio::test]
  async fn one_post_carries_every_recipient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/emails"))
      .and(bearer_token("re_test"))
      .and(body_json(json!({
        "from": "Classroom <notifications@classroom.local>",
        "to": ["parent@example.com", "aunt@example.com"],
        "subject": "Ana Lima: result for Essay",
        "html": "<p>Result: 18 / 20</p>",
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_123"})))
      .expect(1)
      .mount(&server)
      .await;

    mailer_for(&server).send(&message()).await.unwrap();
  }

  #[tokio::test]
  async fn provider_rejection_becomes_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/emails"))
      .respond_with(ResponseTemplate::new(422).set_body_json(json!({"statusCode": 422, "message": "Invalid `to`"})))
      .mount(&server)
      .await;

    match mailer_for(&server).send(&message()).await {
      Err(MailError::Http { status, message }) => {
        assert_eq!(status, 422);
        assert_eq!(message, "Invalid `to`");
      }
      other => panic!("unexpected: {other:?}"),
    }
  }
}

