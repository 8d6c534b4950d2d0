//! HTTP server wiring for Wall.
//!
//! Holds the runtime configuration and assembles the top-level axum
//! [`Router`]: the JSON API under `/api` plus a liveness probe.

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use wall_api::Defaults;
use wall_core::store::WallStore;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5240 }

fn default_store_path() -> PathBuf { PathBuf::from("wall.sqlite3") }

fn default_scope() -> String { "console".to_string() }

/// Runtime server configuration, deserialised from `config.toml` and
/// `WALL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// The release version new records are filed under.
  pub current_version: String,
  /// Scope used when a request names none.
  #[serde(default = "default_scope")]
  pub default_scope:   String,
}

impl ServerConfig {
  pub fn defaults(&self) -> Defaults {
    Defaults {
      scope:           self.default_scope.clone(),
      current_version: self.current_version.clone(),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level [`Router`]. `store` must already have passed
/// `ensure_schema`.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: WallStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
    .nest("/api", wall_api::api_router(store, config.defaults()))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
