//! Handlers for `/facilities` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/facilities` | Drafts included, each with its hits |
//! | `POST`   | `/facilities` | 400 without `name`, `type`, `location` or `capacity` |
//! | `GET`    | `/facilities/{id}` | 404 if not found |
//! | `PUT`    | `/facilities/{id}` | Merge patch; `hit` is derived and cannot be set |
//! | `DELETE` | `/facilities/{id}` | Removes the facility's hits too |
//! | `PATCH`  | `/facilities/{id}/hit` | Flip the stored flag |

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use oilwatch_core::{
  facility::{Facility, FacilityId, FacilityPatch, FacilityType, Location, NewFacility},
  hit::Hit,
  store::FacilityStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  AppState,
  error::{ApiError, or_empty},
};

/// A facility together with its hits, newest first.
#[derive(Debug, Serialize)]
pub struct FacilityRecord {
  #[serde(flatten)]
  pub facility: Facility,
  pub hits:     Vec<Hit>,
}

async fn find<S: FacilityStore>(store: &S, id: FacilityId) -> Result<Facility, ApiError> {
  store
    .get_facility(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("facility {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /facilities`
pub async fn list<S: FacilityStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<FacilityRecord>>, ApiError> {
  let facilities = or_empty(state.store.list_facilities().await, "facilities")?;
  let hits = or_empty(state.store.list_all_hits().await, "hits")?;

  let mut by_facility: HashMap<FacilityId, Vec<Hit>> = HashMap::new();
  for hit in hits {
    by_facility.entry(hit.facility_id).or_default().push(hit);
  }

  let records = facilities
    .into_iter()
    .map(|facility| {
      let hits = by_facility.remove(&facility.id).unwrap_or_default();
      FacilityRecord { facility, hits }
    })
    .collect();
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// Request body for `POST /facilities`. Required fields are optional here so
/// that a missing one is reported as a 400 with a message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub name:          Option<String>,
  #[serde(rename = "type")]
  pub facility_type: Option<String>,
  pub location:      Option<Location>,
  pub capacity:      Option<f64>,
  pub gas_capacity:  Option<f64>,
  /// Absent means a new draft.
  pub draft:         Option<bool>,
  pub description:   Option<String>,
}

impl CreateBody {
  pub fn into_new_facility(self) -> Result<NewFacility, ApiError> {
    fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
      value.ok_or_else(|| ApiError::BadRequest(format!("missing required field `{field}`")))
    }

    let facility_type: FacilityType = required(self.facility_type, "type")?
      .trim()
      .parse()
      .map_err(|_| ApiError::BadRequest("unknown facility type".into()))?;

    let mut input = NewFacility::new(
      required(self.name, "name")?,
      facility_type,
      required(self.location, "location")?,
      required(self.capacity, "capacity")?,
    );
    input.gas_capacity = self.gas_capacity;
    if let Some(draft) = self.draft {
      input.draft = draft;
    }
    input.description = self.description;
    Ok(input)
  }
}

/// `POST /facilities`
pub async fn create<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body.into_new_facility()?;
  let facility = state.store.create_facility(input).await.map_err(ApiError::store)?;
  info!(facility = facility.id, name = %facility.name, "created facility");
  Ok((StatusCode::CREATED, Json(facility)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /facilities/{id}`
pub async fn get_one<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
) -> Result<Json<FacilityRecord>, ApiError> {
  let facility = find(state.store.as_ref(), id).await?;
  let hits = state.store.list_hits_by_facility(id).await.map_err(ApiError::store)?;
  Ok(Json(FacilityRecord { facility, hits }))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /facilities/{id}`. Fields absent from the body are left unchanged.
pub async fn update<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
  Json(patch): Json<FacilityPatch>,
) -> Result<Json<Facility>, ApiError> {
  let mut facility = find(state.store.as_ref(), id).await?;
  facility.apply(patch)?;
  let written = state.store.put_facility(facility).await.map_err(ApiError::store)?;
  Ok(Json(written))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /facilities/{id}`
pub async fn delete_one<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_facility(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("facility {id} not found")));
  }
  info!(facility = id, "deleted facility");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Toggle ───────────────────────────────────────────────────────────────────

/// `PATCH /facilities/{id}/hit`
///
/// An operator override. The flag is re-derived from the hits again on the
/// next hit change for this facility.
pub async fn toggle_hit<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<FacilityId>,
) -> Result<Json<Facility>, ApiError> {
  let current = find(state.store.as_ref(), id).await?;
  let facility = state
    .store
    .set_hit_flag(id, !current.hit)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("facility {id} not found")))?;
  Ok(Json(facility))
}
