//! `GET /map`, the public facility view.
//!
//! Drafts (facilities and hits) are removed first, then the query parameters
//! narrow the list. Query parameters (all optional):
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `type` | `refinery`, `extraction`, `storage`; `all` or empty for every type |
//! | `search` | case-insensitive name substring |
//! | `hitStatus` | `all`, `hit`, `operational` |
//! | `minCapacity` / `minGasCapacity` | inclusive lower bounds |
//! | `showRefinery` / `showExtraction` / `showStorage` | layer toggles |

use axum::{
  Json,
  extract::{Query, State},
};
use oilwatch_core::{
  derived::{FacilitySummary, public_view},
  facility::FacilityType,
  filter::{FacilityFilter, HitStatusFilter, TypeVisibility},
  store::FacilityStore,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
  AppState,
  error::{ApiError, or_empty},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapParams {
  #[serde(rename = "type")]
  pub facility_type:    Option<String>,
  pub search:           Option<String>,
  pub hit_status:       Option<String>,
  pub min_capacity:     Option<f64>,
  pub min_gas_capacity: Option<f64>,
  pub show_refinery:    Option<bool>,
  pub show_extraction:  Option<bool>,
  pub show_storage:     Option<bool>,
}

impl MapParams {
  pub fn into_filter(self) -> Result<FacilityFilter, ApiError> {
    let facility_type = match self.facility_type.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(t) if t.eq_ignore_ascii_case("all") => None,
      Some(t) => Some(
        t.parse::<FacilityType>()
          .map_err(|_| ApiError::BadRequest(format!("unknown facility type {t:?}")))?,
      ),
    };

    let hit_status = match self.hit_status.as_deref().map(str::trim) {
      None | Some("") => HitStatusFilter::All,
      Some(s) => s
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown hit status {s:?}")))?,
    };

    Ok(FacilityFilter {
      facility_type,
      visibility: TypeVisibility {
        refinery:   self.show_refinery.unwrap_or(true),
        extraction: self.show_extraction.unwrap_or(true),
        storage:    self.show_storage.unwrap_or(true),
      },
      hit_status,
      min_capacity: self.min_capacity.unwrap_or(0.0),
      min_gas_capacity: self.min_gas_capacity.unwrap_or(0.0),
      search: self.search,
    })
  }
}

/// `GET /map`
pub async fn handler<S: FacilityStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<MapParams>,
) -> Result<Json<Vec<FacilitySummary>>, ApiError> {
  let filter = params.into_filter()?;

  let facilities = or_empty(state.store.list_facilities().await, "facilities")?;
  let hits = or_empty(state.store.list_all_hits().await, "hits")?;

  let view = filter.apply(public_view(facilities, &hits));
  debug!(shown = view.len(), "map view");
  Ok(Json(view))
}
