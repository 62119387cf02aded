//! Loading service configuration from TOML, with environment overrides.
//!
//! See `AppConfig` for the expected schema. Every section is optional.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerCfg,
  #[serde(default)]
  pub backend: BackendCfg,
  #[serde(default)]
  pub email: EmailCfg,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerCfg {
  #[serde(default = "default_port")] pub port: u16,
}

impl Default for ServerCfg {
  fn default() -> Self { Self { port: default_port() } }
}

fn default_port() -> u16 { 3000 }

/// Backend-as-a-service connection. Without `url` the in-memory demo store is used.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct BackendCfg {
  #[serde(default)] pub url: Option<String>,
  #[serde(default)] pub anon_key: Option<String>,
  /// Needed for writes; reads fall back to the anon key.
  #[serde(default)] pub service_role_key: Option<String>,
}

/// Transactional email provider settings and message templates.
/// Templates accept `{student}`, `{assignment}` and `{score}`.
#[derive(Clone, Debug, Deserialize)]
pub struct EmailCfg {
  #[serde(default)] pub api_key: Option<String>,
  #[serde(default = "default_email_base")] pub base_url: String,
  #[serde(default = "default_email_from")] pub from: String,
  #[serde(default = "default_subject")] pub subject_template: String,
  #[serde(default = "default_body")] pub body_template: String,
}

impl Default for EmailCfg {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: default_email_base(),
      from: default_email_from(),
      subject_template: default_subject(),
      body_template: default_body(),
    }
  }
}

fn default_email_base() -> String { "https://api.resend.com".into() }
fn default_email_from() -> String { "Classroom <notifications@classroom.local>".into() }
fn default_subject() -> String { "{student}: result for {assignment}".into() }
fn default_body() -> String {
  "<p>Hello,</p><p>{student} has a new result for <strong>{assignment}</strong>.</p><p>Result: {score}</p>".into()
}

impl AppConfig {
  /// File (if `APP_CONFIG_PATH` is set and readable) then env overrides.
  pub fn load() -> Self {
    let mut cfg = load_config_file_from_env().unwrap_or_default();
    cfg.apply_env(|k| std::env::var(k).ok());
    cfg
  }

  /// Apply overrides from a variable lookup. Empty values are ignored.
  pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
    let get = |k: &str| var(k).filter(|v| !v.trim().is_empty());
    if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(v) = get("BACKEND_URL") { self.backend.url = Some(v.trim_end_matches('/').to_string()); }
    if let Some(v) = get("BACKEND_ANON_KEY") { self.backend.anon_key = Some(v); }
    if let Some(v) = get("BACKEND_SERVICE_ROLE_KEY") { self.backend.service_role_key = Some(v); }
    if let Some(v) = get("RESEND_API_KEY") { self.email.api_key = Some(v); }
    if let Some(v) = get("EMAIL_FROM") { self.email.from = v; }
    if let Some(v) = get("EMAIL_API_BASE_URL") { self.email.base_url = v.trim_end_matches('/').to_string(); }
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "classroom_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "classroom_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "classroom_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
