//! Handlers for `/records` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/records` | Body: [`CreateBody`]; returns 201 + stored record |
//! | `GET`    | `/records` | Optional `?scope`, `?version` (`all` for every version), `?name` |
//! | `DELETE` | `/records/:id` | 204, or 404 if nothing matched |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use wall_core::{
  record::{NewRecord, RecordView},
  store::{RecordQuery, VersionFilter, WallStore},
};

use crate::{ApiState, error::ApiError};

/// Trim `value`, rejecting it if nothing is left.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ApiError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be empty")));
  }
  Ok(trimmed.to_owned())
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// Defaults to the configured scope.
  pub scope:       Option<String>,
  /// Subject name; the subject is created on first use.
  pub name:        String,
  pub text:        String,
  /// Defaults to the configured current version.
  pub version:     Option<String>,
  /// Defaults to the time the request was handled.
  pub occurred_at: Option<DateTime<Utc>>,
}

/// `POST /records`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WallStore,
{
  let name    = required("name", &body.name)?;
  let text    = required("text", &body.text)?;
  let scope   = body.scope.unwrap_or_else(|| state.defaults.scope.clone());
  let version = body
    .version
    .unwrap_or_else(|| state.defaults.current_version.clone());

  let subject = state
    .store
    .upsert_subject(&name, &scope)
    .await
    .map_err(ApiError::store)?;

  let input = NewRecord::new(subject.id, scope, version, text)
    .occurred_at(body.occurred_at.unwrap_or_else(Utc::now));

  let record = state.store.record(input).await.map_err(ApiError::store)?;
  tracing::info!(id = record.id, subject = %subject.name, "recorded");

  Ok((StatusCode::CREATED, Json(record)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub scope:   Option<String>,
  /// Defaults to the configured current version.
  pub version: Option<VersionFilter>,
  /// Restrict to one subject by name.
  pub name:    Option<String>,
}

/// `GET /records[?scope=...][&version=...][&name=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RecordView>>, ApiError>
where
  S: WallStore,
{
  let query = RecordQuery {
    scope:        params.scope.unwrap_or_else(|| state.defaults.scope.clone()),
    version:      params.version.unwrap_or_else(|| {
      VersionFilter::Only(state.defaults.current_version.clone())
    }),
    subject_name: params.name,
  };

  let records = state
    .store
    .list_records(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Remove ───────────────────────────────────────────────────────────────────

/// `DELETE /records/:id`
pub async fn remove<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: WallStore,
{
  let matched = state
    .store
    .remove_record(id)
    .await
    .map_err(ApiError::store)?;

  if matched {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("record {id} not found")))
  }
}
