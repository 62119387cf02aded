//! Application state: the store and session seams, the optional mailer, email
//! templates and the background recalculation queue.
//!
//! With a backend URL configured every seam is the REST client; without one
//! the service runs on the in-memory store seeded with demo data.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::baas::BaasClient;
use crate::config::{AppConfig, EmailCfg};
use crate::mailer::{Mailer, ResendMailer};
use crate::seeds::demo_data;
use crate::store::{DataStore, MemoryStore, SessionResolver};
use crate::tasks::RecalcQueue;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DataStore>,
  pub sessions: Arc<dyn SessionResolver>,
  pub mailer: Option<Arc<dyn Mailer>>,
  pub email: EmailCfg,
  pub recalc: RecalcQueue,
}

impl AppState {
  /// Build state from config. Must be called inside the tokio runtime.
  #[instrument(level = "info", skip_all)]
  pub fn from_config(cfg: &AppConfig) -> Self {
    let (store, sessions): (Arc<dyn DataStore>, Arc<dyn SessionResolver>) = match BaasClient::from_config(&cfg.backend) {
      Some(client) => {
        info!(target: "classroom_backend", base_url = %client.base_url, service_role = cfg.backend.service_role_key.is_some(), "Backend enabled.");
        let client = Arc::new(client);
        (client.clone() as Arc<dyn DataStore>, client as Arc<dyn SessionResolver>)
      }
      None => {
        warn!(target: "classroom_backend", "BACKEND_URL not set. Using in-memory store with demo data.");
        let mem = Arc::new(MemoryStore::new(demo_data()));
        (mem.clone() as Arc<dyn DataStore>, mem as Arc<dyn SessionResolver>)
      }
    };

    let mailer: Option<Arc<dyn Mailer>> = match ResendMailer::from_config(&cfg.email) {
      Some(m) => {
        info!(target: "classroom_backend", base_url = %cfg.email.base_url, from = %cfg.email.from, "Email enabled.");
        Some(Arc::new(m) as Arc<dyn Mailer>)
      }
      None => {
        info!(target: "classroom_backend", "Email disabled (no RESEND_API_KEY). Notifications will fail with 503.");
        None
      }
    };

    Self::with_parts(store, sessions, mailer, cfg.email.clone())
  }

  pub fn with_parts(
    store: Arc<dyn DataStore>,
    sessions: Arc<dyn SessionResolver>,
    mailer: Option<Arc<dyn Mailer>>,
    email: EmailCfg,
  ) -> Self {
    let recalc = RecalcQueue::spawn(store.clone());
    Self { store, sessions, mailer, email, recalc }
  }
}
