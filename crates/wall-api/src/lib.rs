//! JSON REST API for Wall.
//!
//! Exposes an axum [`Router`] backed by any [`wall_core::store::WallStore`].
//! Schema initialisation, auth, and transport concerns are the caller's
//! responsibility; the store must already have passed `ensure_schema`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", wall_api::api_router(store.clone(), defaults))
//! ```

pub mod error;
pub mod import;
pub mod records;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use wall_core::store::WallStore;

pub use error::ApiError;

/// Values substituted when a request leaves them out.
#[derive(Debug, Clone)]
pub struct Defaults {
  /// Scope used when the request names none.
  pub scope:           String,
  /// The release version new records are filed under and listings default to.
  pub current_version: String,
}

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub defaults: Arc<Defaults>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), defaults: self.defaults.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, defaults: Defaults) -> Router<()>
where
  S: WallStore + 'static,
{
  let state = ApiState { store, defaults: Arc::new(defaults) };

  Router::new()
    // Records
    .route("/records", get(records::list::<S>).post(records::create::<S>))
    .route("/records/import", post(import::handler::<S>))
    .route("/records/{id}", delete(records::remove::<S>))
    // Aggregation
    .route("/stats", get(stats::handler::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
