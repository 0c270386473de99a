//! Filter predicates over the public facility list.
//!
//! A [`FacilityFilter`] expands into a list of independent [`Criterion`]
//! values which are AND-combined, so the order they are evaluated in never
//! changes the result. Draft facilities are removed before filtering, by
//! [`crate::derived::public_view`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  derived::FacilitySummary,
  facility::{Facility, FacilityType},
};

/// Which facilities to show by their hit flag.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HitStatusFilter {
  #[default]
  All,
  Hit,
  Operational,
}

/// Per-type map-layer toggles, independent of the type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVisibility {
  pub refinery:   bool,
  pub extraction: bool,
  pub storage:    bool,
}

impl Default for TypeVisibility {
  fn default() -> Self { Self { refinery: true, extraction: true, storage: true } }
}

impl TypeVisibility {
  pub fn shows(&self, facility_type: FacilityType) -> bool {
    match facility_type {
      FacilityType::Refinery => self.refinery,
      FacilityType::Extraction => self.extraction,
      FacilityType::Storage => self.storage,
    }
  }
}

// ─── Criteria ────────────────────────────────────────────────────────────────

/// One independent predicate over a facility.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
  Type(FacilityType),
  Visible(TypeVisibility),
  HitStatus(HitStatusFilter),
  MinCapacity(f64),
  /// A facility without a gas capacity never satisfies a positive threshold.
  MinGasCapacity(f64),
  /// Holds the needle already lowercased.
  NameContains(String),
}

impl Criterion {
  pub fn matches(&self, facility: &Facility) -> bool {
    match self {
      Self::Type(t) => facility.facility_type == *t,
      Self::Visible(v) => v.shows(facility.facility_type),
      Self::HitStatus(HitStatusFilter::All) => true,
      Self::HitStatus(HitStatusFilter::Hit) => facility.hit,
      Self::HitStatus(HitStatusFilter::Operational) => !facility.hit,
      Self::MinCapacity(min) => facility.capacity >= *min,
      Self::MinGasCapacity(min) => facility.gas_capacity.is_some_and(|g| g >= *min),
      Self::NameContains(needle) => facility.name.to_lowercase().contains(needle.as_str()),
    }
  }
}

/// True iff `facility` satisfies every criterion.
pub fn matches_all(criteria: &[Criterion], facility: &Facility) -> bool {
  criteria.iter().all(|c| c.matches(facility))
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// The full set of map filters. The default lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FacilityFilter {
  /// `None` means every type.
  pub facility_type:    Option<FacilityType>,
  pub visibility:       TypeVisibility,
  pub hit_status:       HitStatusFilter,
  pub min_capacity:     f64,
  pub min_gas_capacity: f64,
  /// Case-insensitive substring of the facility name.
  pub search:           Option<String>,
}

impl FacilityFilter {
  /// The active criteria. Settings that cannot exclude anything are left
  /// out.
  pub fn criteria(&self) -> Vec<Criterion> {
    let mut criteria = Vec::new();
    if let Some(t) = self.facility_type {
      criteria.push(Criterion::Type(t));
    }
    if self.visibility != TypeVisibility::default() {
      criteria.push(Criterion::Visible(self.visibility));
    }
    if self.hit_status != HitStatusFilter::All {
      criteria.push(Criterion::HitStatus(self.hit_status));
    }
    if self.min_capacity > 0.0 {
      criteria.push(Criterion::MinCapacity(self.min_capacity));
    }
    if self.min_gas_capacity > 0.0 {
      criteria.push(Criterion::MinGasCapacity(self.min_gas_capacity));
    }
    if let Some(search) = self.search.as_deref().map(str::trim)
      && !search.is_empty()
    {
      criteria.push(Criterion::NameContains(search.to_lowercase()));
    }
    criteria
  }

  pub fn matches(&self, facility: &Facility) -> bool { matches_all(&self.criteria(), facility) }

  /// Keep the matching summaries, preserving their order.
  pub fn apply(&self, summaries: Vec<FacilitySummary>) -> Vec<FacilitySummary> {
    let criteria = self.criteria();
    summaries
      .into_iter()
      .filter(|s| matches_all(&criteria, &s.facility))
      .collect()
  }
}
