//! Handlers for hit endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/facilities/{id}/hits` | Newest first; 404 if the facility is missing |
//! | `POST`   | `/facilities/{id}/hits` | `date` defaults to today |
//! | `PUT`    | `/facilities/{id}/hits/{hit_id}` | Merge patch |
//! | `DELETE` | `/facilities/{id}/hits/{hit_id}` | |
//! | `GET`    | `/hits` | Every hit, newest first |
//!
//! A hit addressed under the wrong facility is reported as not found.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use oilwatch_core::{
  document::parse_date,
  facility::FacilityId,
  hit::{Hit, HitId, HitPatch, NewHit, Severity},
  store::FacilityStore,
};
use serde::Deserialize;
use tracing::info;

use crate::{
  AppState,
  error::{ApiError, or_empty},
};

async fn require_facility<S: FacilityStore>(store: &S, id: FacilityId) -> Result<(), ApiError> {
  match store.get_facility(id).await.map_err(ApiError::store)? {
    Some(_) => Ok(()),
    None => Err(ApiError::NotFound(format!("facility {id} not found"))),
  }
}

/// Fetch a hit, treating one owned by another facility as absent.
async fn find_owned<S: FacilityStore>(
  store: &S,
  facility_id: FacilityId,
  hit_id: HitId,
) -> Result<Hit, ApiError> {
  store
    .get_hit(hit_id)
    .await
    .map_err(ApiError::store)?
    .filter(|h| h.facility_id == facility_id)
    .ok_or_else(|| ApiError::NotFound(format!("hit {hit_id} not found for facility {facility_id}")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /facilities/{id}/hits`
pub async fn list_for_facility<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
) -> Result<Json<Vec<Hit>>, ApiError> {
  require_facility(state.store.as_ref(), id).await?;
  let hits = state.store.list_hits_by_facility(id).await.map_err(ApiError::store)?;
  Ok(Json(hits))
}

/// `GET /hits`
pub async fn list_all<S: FacilityStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Hit>>, ApiError> {
  Ok(Json(or_empty(state.store.list_all_hits().await, "hits")?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// Request body for `POST /facilities/{id}/hits`.
///
/// `date` may be a bare date or a full timestamp. A single legacy `videoLink`
/// is appended to `mediaLinks`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBody {
  pub date:                 Option<String>,
  pub severity:             Option<Severity>,
  pub damage_percentage:    Option<f64>,
  pub media_links:          Vec<String>,
  pub video_link:           Option<String>,
  pub expected_repair_time: Option<u32>,
  pub notes:                Option<String>,
  pub draft:                bool,
}

impl CreateBody {
  pub fn into_new_hit(self, facility_id: FacilityId) -> Result<NewHit, ApiError> {
    let date = match self.date.as_deref() {
      Some(raw) => parse_date(raw)?,
      None => Utc::now().date_naive(),
    };

    let mut input = NewHit::new(facility_id, date);
    input.severity = self.severity;
    input.damage_percentage = self.damage_percentage;
    input.media_links = self.media_links;
    input.media_links.extend(self.video_link);
    input.expected_repair_time = self.expected_repair_time;
    input.notes = self.notes;
    input.draft = self.draft;
    Ok(input)
  }
}

/// `POST /facilities/{id}/hits`
pub async fn create<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body.into_new_hit(id)?;
  let hit = state.store.create_hit(input).await.map_err(ApiError::store)?;
  info!(facility = id, hit = hit.id, draft = hit.draft, "recorded hit");
  Ok((StatusCode::CREATED, Json(hit)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /facilities/{id}/hits/{hit_id}`
pub async fn update<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path((id, hit_id)): Path<(FacilityId, HitId)>,
  Json(patch): Json<HitPatch>,
) -> Result<Json<Hit>, ApiError> {
  let mut hit = find_owned(state.store.as_ref(), id, hit_id).await?;
  hit.apply(patch)?;
  let written = state.store.put_hit(hit).await.map_err(ApiError::store)?;
  Ok(Json(written))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /facilities/{id}/hits/{hit_id}`
pub async fn delete_one<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path((id, hit_id)): Path<(FacilityId, HitId)>,
) -> Result<StatusCode, ApiError> {
  find_owned(state.store.as_ref(), id, hit_id).await?;
  state
    .store
    .delete_hit(hit_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("hit {hit_id} not found")))?;
  info!(facility = id, hit = hit_id, "deleted hit");
  Ok(StatusCode::NO_CONTENT)
}
