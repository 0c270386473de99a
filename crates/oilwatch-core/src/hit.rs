//! Hits: recorded strike events against a facility.
//!
//! A hit is owned by exactly one facility. Draft hits are kept for editing but
//! never contribute to public aggregates or to the owning facility's `hit`
//! flag.

use std::cmp::Reverse;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, facility::FacilityId};

pub type HitId = i64;

/// Assessed outcome of a strike.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
  Damaged,
  Destroyed,
}

// ─── Hit ─────────────────────────────────────────────────────────────────────

/// A persisted hit in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
  pub id:                   HitId,
  pub facility_id:          FacilityId,
  /// Strike date; no time-zone semantics.
  pub date:                 NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub severity:             Option<Severity>,
  /// Share of the facility's nominal capacity knocked offline, 0–100.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub damage_percentage:    Option<f64>,
  #[serde(default)]
  pub media_links:          Vec<String>,
  /// Days.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expected_repair_time: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:                Option<String>,
  #[serde(default)]
  pub draft:                bool,
}

impl Hit {
  pub fn is_published(&self) -> bool { !self.draft }

  pub fn validate(&self) -> Result<()> { validate_damage(self.damage_percentage) }

  /// Merge `patch` onto this hit and re-validate the result.
  pub fn apply(&mut self, patch: HitPatch) -> Result<()> {
    if let Some(date) = patch.date {
      self.date = date;
    }
    if let Some(severity) = patch.severity {
      self.severity = severity;
    }
    if let Some(damage) = patch.damage_percentage {
      self.damage_percentage = damage;
    }
    if let Some(links) = patch.media_links {
      self.media_links = normalize_media_links(links);
    }
    if let Some(days) = patch.expected_repair_time {
      self.expected_repair_time = days;
    }
    if let Some(notes) = patch.notes {
      self.notes = notes;
    }
    if let Some(draft) = patch.draft {
      self.draft = draft;
    }
    self.validate()
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Everything needed to record a hit. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHit {
  pub facility_id:          FacilityId,
  pub date:                 NaiveDate,
  #[serde(default)]
  pub severity:             Option<Severity>,
  #[serde(default)]
  pub damage_percentage:    Option<f64>,
  #[serde(default)]
  pub media_links:          Vec<String>,
  #[serde(default)]
  pub expected_repair_time: Option<u32>,
  #[serde(default)]
  pub notes:                Option<String>,
  #[serde(default)]
  pub draft:                bool,
}

impl NewHit {
  pub fn new(facility_id: FacilityId, date: NaiveDate) -> Self {
    Self {
      facility_id,
      date,
      severity: None,
      damage_percentage: None,
      media_links: Vec::new(),
      expected_repair_time: None,
      notes: None,
      draft: false,
    }
  }

  pub fn with_damage(mut self, percentage: f64) -> Self {
    self.damage_percentage = Some(percentage);
    self
  }

  pub fn as_draft(mut self) -> Self {
    self.draft = true;
    self
  }

  pub fn validate(&self) -> Result<()> { validate_damage(self.damage_percentage) }

  pub fn into_hit(self, id: HitId) -> Hit {
    Hit {
      id,
      facility_id: self.facility_id,
      date: self.date,
      severity: self.severity,
      damage_percentage: self.damage_percentage,
      media_links: normalize_media_links(self.media_links),
      expected_repair_time: self.expected_repair_time,
      notes: self.notes,
      draft: self.draft,
    }
  }
}

/// A partial update. The owning facility cannot be changed through a patch.
/// An explicit `null` clears the optional assessment fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPatch {
  pub date:                 Option<NaiveDate>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub severity:             Option<Option<Severity>>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub damage_percentage:    Option<Option<f64>>,
  pub media_links:          Option<Vec<String>>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub expected_repair_time: Option<Option<u32>>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub notes:                Option<Option<String>>,
  pub draft:                Option<bool>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Trim every link and drop the empty ones, keeping order.
pub fn normalize_media_links(links: Vec<String>) -> Vec<String> {
  links
    .into_iter()
    .map(|link| link.trim().to_owned())
    .filter(|link| !link.is_empty())
    .collect()
}

/// Newest first by date; equal dates fall back to the higher id first.
pub fn sort_newest_first(hits: &mut [Hit]) {
  hits.sort_by_key(|h| (Reverse(h.date), Reverse(h.id)));
}

fn validate_damage(damage: Option<f64>) -> Result<()> {
  match damage {
    Some(d) if !(0.0..=100.0).contains(&d) => Err(Error::Validation(format!(
      "damagePercentage must be within [0, 100], got {d}"
    ))),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn into_hit_drops_empty_media_links() {
    let mut input = NewHit::new(1, date("2024-03-13"));
    input.media_links = vec![
      " https://t.me/a/1 ".into(),
      String::new(),
      "   ".into(),
      "https://x.com/b".into(),
    ];
    let hit = input.into_hit(4);
    assert_eq!(hit.media_links, vec!["https://t.me/a/1", "https://x.com/b"]);
  }

  #[test]
  fn damage_outside_range_is_rejected() {
    assert!(NewHit::new(1, date("2024-01-01")).with_damage(100.0).validate().is_ok());
    assert!(NewHit::new(1, date("2024-01-01")).with_damage(100.5).validate().is_err());
    assert!(NewHit::new(1, date("2024-01-01")).with_damage(-1.0).validate().is_err());
  }

  #[test]
  fn sort_is_newest_first_with_id_tiebreak() {
    let mut hits = vec![
      NewHit::new(1, date("2024-01-05")).into_hit(1),
      NewHit::new(1, date("2024-02-01")).into_hit(2),
      NewHit::new(1, date("2024-01-05")).into_hit(3),
    ];
    sort_newest_first(&mut hits);
    let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
  }

  #[test]
  fn apply_patch_publishes_draft() {
    let mut hit = NewHit::new(1, date("2024-01-05")).as_draft().into_hit(9);
    assert!(!hit.is_published());
    hit
      .apply(HitPatch {
        draft: Some(false),
        severity: Some(Some(Severity::Destroyed)),
        ..Default::default()
      })
      .unwrap();
    assert!(hit.is_published());
    assert_eq!(hit.severity, Some(Severity::Destroyed));
    assert_eq!(hit.facility_id, 1);
  }

  #[test]
  fn explicit_null_clears_assessment() {
    let mut input = NewHit::new(1, date("2024-01-05")).with_damage(30.0);
    input.severity = Some(Severity::Damaged);
    input.notes = Some("flare stack".into());
    let mut hit = input.into_hit(2);

    let patch: HitPatch =
      serde_json::from_str(r#"{ "severity": null, "damagePercentage": null, "notes": null }"#)
        .unwrap();
    hit.apply(patch).unwrap();
    assert_eq!(hit.severity, None);
    assert_eq!(hit.damage_percentage, None);
    assert_eq!(hit.notes, None);

    let untouched: HitPatch = serde_json::from_str(r#"{ "draft": true }"#).unwrap();
    assert_eq!(untouched.severity, None);
    assert_eq!(untouched.notes, None);
  }
}
