//! Handler for `GET /stats`.
//!
//! Returns one bucket per version, each holding the top entries plus an
//! optional "Others" remainder, ready for a per-version chart dataset.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use wall_core::{
  stats::{StatEntry, VersionStats},
  store::{VersionFilter, WallStore},
};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  pub scope:   Option<String>,
  /// Defaults to every version.
  #[serde(default)]
  pub version: VersionFilter,
}

/// A serialised [`VersionStats`] with the remainder spelled out.
#[derive(Debug, Serialize)]
pub struct StatsBucket {
  pub version: String,
  pub label:   String,
  pub entries: Vec<StatEntry>,
  pub others:  Option<StatEntry>,
  pub total:   u64,
}

impl From<VersionStats> for StatsBucket {
  fn from(stats: VersionStats) -> Self {
    Self {
      others:  stats.others(),
      total:   stats.total(),
      version: stats.version,
      label:   stats.label,
      entries: stats.entries,
    }
  }
}

/// `GET /stats[?scope=...][&version=...]`
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<StatsParams>,
) -> Result<Json<Vec<StatsBucket>>, ApiError>
where
  S: WallStore,
{
  let scope = params.scope.unwrap_or_else(|| state.defaults.scope.clone());

  let stats = state
    .store
    .compute_top_stats(&scope, &params.version)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(stats.into_iter().map(StatsBucket::from).collect()))
}
