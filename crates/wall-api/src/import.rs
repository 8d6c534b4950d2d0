//! Handler for `POST /records/import`: batch text import.
//!
//! The body is plain text with one record per line, written as
//! `name, text, version`. The first field is the subject name and the last is
//! the version; anything in between is the record text, so the text may
//! itself contain commas. Blank lines are skipped. Imported records carry no
//! timestamp.
//!
//! The whole body is parsed before anything is written; a malformed line
//! rejects the batch.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use wall_core::{record::NewRecord, store::WallStore};

use crate::{ApiState, error::ApiError, records::required};

/// One parsed import line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
  pub name:    String,
  pub text:    String,
  pub version: String,
}

/// Parse the import body. Errors name the 1-based offending line.
pub fn parse_lines(body: &str) -> Result<Vec<ImportLine>, ApiError> {
  body
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(i, line)| {
      let at = |e: ApiError| match e {
        ApiError::BadRequest(m) => ApiError::BadRequest(format!("line {}: {m}", i + 1)),
        other => other,
      };

      let fields: Vec<&str> = line.split(',').collect();
      if fields.len() < 3 {
        return Err(at(ApiError::BadRequest(
          "expected `name, text, version`".into(),
        )));
      }

      let last = fields.len() - 1;
      Ok(ImportLine {
        name:    required("name", fields[0]).map_err(at)?,
        text:    required("text", &fields[1..last].join(",")).map_err(at)?,
        version: required("version", fields[last]).map_err(at)?,
      })
    })
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
  pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
  pub imported: usize,
}

/// `POST /records/import[?scope=...]`: body: plain text.
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ImportParams>,
  body: String,
) -> Result<Json<ImportSummary>, ApiError>
where
  S: WallStore,
{
  let scope = params.scope.unwrap_or_else(|| state.defaults.scope.clone());
  let lines = parse_lines(&body)?;

  for line in &lines {
    let subject = state
      .store
      .upsert_subject(&line.name, &scope)
      .await
      .map_err(ApiError::store)?;

    state
      .store
      .record(NewRecord::new(subject.id, scope.clone(), line.version.clone(), line.text.clone()))
      .await
      .map_err(ApiError::store)?;
  }

  tracing::info!(scope = %scope, imported = lines.len(), "imported records");
  Ok(Json(ImportSummary { imported: lines.len() }))
}
