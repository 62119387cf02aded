//! Classroom backend · grading and derived metrics
//!
//! - Axum HTTP API for grading, guardian notifications, test status and class analytics
//! - Hosted REST backend (PostgREST-style) or in-memory demo data when unconfigured
//! - Transactional email through an HTTP provider when a key is present
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                      : u16 (default 3000)
//!   BACKEND_URL               : base URL of the data backend; unset means demo mode
//!   BACKEND_ANON_KEY          : read key (also used as `apikey` header)
//!   BACKEND_SERVICE_ROLE_KEY  : required for writes (grades, metrics, guardians)
//!   RESEND_API_KEY            : enables guardian notifications
//!   EMAIL_FROM                : sender address
//!   EMAIL_API_BASE_URL        : default "https://api.resend.com"
//!   APP_CONFIG_PATH           : path to TOML config (ports, keys, email templates)
//!   LOG_LEVEL                 : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT                : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod store;
mod baas;
mod mailer;
mod seeds;
mod state;
mod tasks;
mod completion;
mod grading;
mod test_status;
mod notify;
mod analytics;
mod auth;
mod protocol;
mod routes;
#[cfg(test)]
mod testutil;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::load();

  // Store, session resolver, mailer and the recalculation worker.
  let state = Arc::new(AppState::from_config(&cfg));

  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "classroom_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "classroom_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "classroom_backend", error = %e, "Failed to listen for shutdown signal");
  }
}
