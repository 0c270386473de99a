//! `POST /range-rings`: distance outlines around a border polyline.
//!
//! Body: `{"border": [[lat, lon], ...], "distancesKm": [100, 300]}`. One ring
//! is returned per distance, in request order, computed with the server's
//! configured ring settings.

use axum::{Json, extract::State};
use oilwatch_core::{
  geometry::{LatLon, range_ring, validate_ring_input},
  store::FacilityStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingRequest {
  pub border:       Vec<LatLon>,
  pub distances_km: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
  pub distance_km: f64,
  pub points:      Vec<LatLon>,
}

impl RingRequest {
  fn validate(&self) -> Result<(), ApiError> {
    Ok(validate_ring_input(&self.border, &self.distances_km)?)
  }
}

/// `POST /range-rings`
pub async fn handler<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Json(request): Json<RingRequest>,
) -> Result<Json<Vec<Ring>>, ApiError> {
  request.validate()?;
  let rings = request
    .distances_km
    .iter()
    .map(|&distance_km| Ring {
      distance_km,
      points: range_ring(&request.border, distance_km, &state.rings),
    })
    .collect();
  Ok(Json(rings))
}
