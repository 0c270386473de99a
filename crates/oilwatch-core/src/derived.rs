//! Derived state: values computed from the hit collection rather than stored
//! independently.
//!
//! Draft hits never contribute to anything in this module. Store
//! implementations call [`hit_flag`] inside the same critical section as every
//! hit mutation so that `Facility::hit` always agrees with the hit set.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
  facility::{Facility, FacilityId},
  hit::Hit,
};

fn published<'a>(
  facility_id: FacilityId,
  hits: impl IntoIterator<Item = &'a Hit>,
) -> impl Iterator<Item = &'a Hit> {
  hits
    .into_iter()
    .filter(move |h| h.facility_id == facility_id && h.is_published())
}

/// True iff any published hit references `facility_id`.
pub fn hit_flag<'a>(facility_id: FacilityId, hits: impl IntoIterator<Item = &'a Hit>) -> bool {
  published(facility_id, hits).next().is_some()
}

/// Sum of `damagePercentage` over the facility's published hits, missing
/// values counting as zero.
///
/// Not clamped: several strikes on the same site can add up past 100.
pub fn total_damage_percentage<'a>(
  facility_id: FacilityId,
  hits: impl IntoIterator<Item = &'a Hit>,
) -> f64 {
  published(facility_id, hits)
    .map(|h| h.damage_percentage.unwrap_or(0.0))
    .sum()
}

/// Nominal capacity left after `total_damage` percent is knocked offline.
/// Goes negative when the damage total exceeds 100.
pub fn projected_capacity(capacity: f64, total_damage: f64) -> f64 {
  capacity * (1.0 - total_damage / 100.0)
}

/// Set `facility.hit` from `hits`. Returns whether the flag changed.
pub fn reconcile<'a>(facility: &mut Facility, hits: impl IntoIterator<Item = &'a Hit>) -> bool {
  let flag = hit_flag(facility.id, hits);
  let changed = facility.hit != flag;
  facility.hit = flag;
  changed
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// A facility with its derived damage figures attached, as shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySummary {
  #[serde(flatten)]
  pub facility:               Facility,
  pub damage_percentage:      f64,
  /// Number of published hits.
  pub hit_count:              usize,
  pub projected_capacity:     f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub projected_gas_capacity: Option<f64>,
}

impl FacilitySummary {
  pub fn new<'a>(facility: Facility, hits: impl IntoIterator<Item = &'a Hit>) -> Self {
    let mine: Vec<&Hit> = published(facility.id, hits).collect();
    let damage = total_damage_percentage(facility.id, mine.iter().copied());
    Self {
      damage_percentage: damage,
      hit_count: mine.len(),
      projected_capacity: projected_capacity(facility.capacity, damage),
      projected_gas_capacity: facility
        .gas_capacity
        .map(|gas| projected_capacity(gas, damage)),
      facility,
    }
  }
}

/// Summaries for every published facility, in input order. Draft facilities
/// are dropped here, upstream of any filtering.
pub fn public_view(facilities: Vec<Facility>, hits: &[Hit]) -> Vec<FacilitySummary> {
  let mut by_facility: HashMap<FacilityId, Vec<&Hit>> = HashMap::new();
  for hit in hits {
    by_facility.entry(hit.facility_id).or_default().push(hit);
  }

  facilities
    .into_iter()
    .filter(|f| !f.draft)
    .map(|f| {
      let group = by_facility.get(&f.id).map(Vec::as_slice).unwrap_or_default();
      FacilitySummary::new(f, group.iter().copied())
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    facility::{FacilityType, Location, NewFacility},
    hit::NewHit,
  };

  fn facility(id: FacilityId) -> Facility {
    let mut input = NewFacility::new(
      "Volgograd Refinery",
      FacilityType::Refinery,
      Location::new(48.5, 44.5),
      100_000.0,
    )
    .published();
    input.gas_capacity = Some(0.0);
    input.into_facility(id, false)
  }

  fn hit(id: i64, facility_id: FacilityId, damage: f64, draft: bool) -> Hit {
    let date = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
    let mut input = NewHit::new(facility_id, date).with_damage(damage);
    input.draft = draft;
    input.into_hit(id)
  }

  fn scenario() -> Vec<Hit> {
    vec![hit(1, 1, 25.0, false), hit(2, 1, 40.0, false), hit(3, 1, 90.0, true)]
  }

  #[test]
  fn draft_hits_do_not_count() {
    let hits = scenario();
    assert_eq!(total_damage_percentage(1, &hits), 65.0);
    assert!(hit_flag(1, &hits));
    assert_eq!(projected_capacity(100_000.0, 65.0), 35_000.0);
  }

  #[test]
  fn deleting_hits_recomputes_down_to_draft_only() {
    let mut hits = scenario();
    hits.retain(|h| h.id != 1);
    assert_eq!(total_damage_percentage(1, &hits), 40.0);
    assert!(hit_flag(1, &hits));

    hits.retain(|h| h.id != 2);
    assert_eq!(total_damage_percentage(1, &hits), 0.0);
    assert!(!hit_flag(1, &hits));
  }

  #[test]
  fn missing_damage_counts_as_zero() {
    let date = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
    let hits = vec![NewHit::new(1, date).into_hit(1), hit(2, 1, 10.0, false)];
    assert_eq!(total_damage_percentage(1, &hits), 10.0);
  }

  #[test]
  fn other_facilities_hits_are_ignored() {
    let hits = vec![hit(1, 2, 50.0, false)];
    assert!(!hit_flag(1, &hits));
    assert_eq!(total_damage_percentage(1, &hits), 0.0);
  }

  #[test]
  fn damage_is_not_clamped() {
    let hits = vec![hit(1, 1, 80.0, false), hit(2, 1, 70.0, false)];
    let total = total_damage_percentage(1, &hits);
    assert_eq!(total, 150.0);
    assert_eq!(projected_capacity(100_000.0, total), -50_000.0);
  }

  #[test]
  fn reconcile_reports_changes() {
    let hits = scenario();
    let mut f = facility(1);
    assert!(reconcile(&mut f, &hits));
    assert!(f.hit);
    assert!(!reconcile(&mut f, &hits));
  }

  #[test]
  fn summary_carries_derived_figures() {
    let summary = FacilitySummary::new(facility(1), &scenario());
    assert_eq!(summary.damage_percentage, 65.0);
    assert_eq!(summary.hit_count, 2);
    assert_eq!(summary.projected_capacity, 35_000.0);
    assert_eq!(summary.projected_gas_capacity, Some(0.0));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["damagePercentage"], 65.0);
    assert_eq!(json["name"], "Volgograd Refinery");
  }

  #[test]
  fn public_view_drops_drafts() {
    let mut hidden = facility(2);
    hidden.draft = true;
    let view = public_view(vec![facility(1), hidden, facility(3)], &scenario());
    let ids: Vec<_> = view.iter().map(|s| s.facility.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(view[0].damage_percentage, 65.0);
    assert_eq!(view[1].damage_percentage, 0.0);
  }
}
