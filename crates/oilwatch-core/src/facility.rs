//! Facilities, the tracked oil-industry sites.
//!
//! A facility's `hit` flag is derived from the hit collection and is never
//! set by a client directly; see [`crate::derived`].

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

pub type FacilityId = i64;

// ─── Type tag ────────────────────────────────────────────────────────────────

/// What kind of site a facility is.
///
/// Serialises lowercase. Parsing is case-insensitive because historical
/// records were written with mixed case (`"Refinery"`, `"STORAGE"`).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FacilityType {
  Refinery,
  Extraction,
  Storage,
}

impl<'de> Deserialize<'de> for FacilityType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("unknown facility type: {raw:?}")))
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// Decimal-degree coordinates. This nested form is the only one ever written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Location {
  pub fn new(latitude: f64, longitude: f64) -> Self { Self { latitude, longitude } }

  pub fn validate(&self) -> Result<()> {
    if !(-90.0..=90.0).contains(&self.latitude) {
      return Err(Error::Validation(format!(
        "latitude {} is outside [-90, 90]",
        self.latitude
      )));
    }
    if !(-180.0..=180.0).contains(&self.longitude) {
      return Err(Error::Validation(format!(
        "longitude {} is outside [-180, 180]",
        self.longitude
      )));
    }
    Ok(())
  }
}

// ─── Facility ────────────────────────────────────────────────────────────────

/// A persisted facility in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
  pub id:            FacilityId,
  pub name:          String,
  #[serde(rename = "type")]
  pub facility_type: FacilityType,
  pub location:      Location,
  /// Nominal throughput in barrels/day (barrels for storage sites).
  pub capacity:      f64,
  /// Nominal annual gas throughput in m³/year.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gas_capacity:  Option<f64>,
  /// True iff at least one published hit references this facility.
  #[serde(default)]
  pub hit:           bool,
  /// Hidden from public views when true.
  #[serde(default)]
  pub draft:         bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:   Option<String>,
}

impl Facility {
  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.name, &self.location, self.capacity, self.gas_capacity)
  }

  /// Merge `patch` onto this facility and re-validate the result.
  pub fn apply(&mut self, patch: FacilityPatch) -> Result<()> {
    if let Some(name) = patch.name {
      self.name = name;
    }
    if let Some(facility_type) = patch.facility_type {
      self.facility_type = facility_type;
    }
    if let Some(location) = patch.location {
      self.location = location;
    }
    if let Some(capacity) = patch.capacity {
      self.capacity = capacity;
    }
    if let Some(gas_capacity) = patch.gas_capacity {
      self.gas_capacity = gas_capacity;
    }
    if let Some(draft) = patch.draft {
      self.draft = draft;
    }
    if let Some(description) = patch.description {
      self.description = description;
    }
    self.validate()
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Everything needed to create a facility. The store assigns the id and
/// derives the `hit` flag. New facilities start as drafts, hidden from the
/// public map until published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFacility {
  pub name:          String,
  #[serde(rename = "type")]
  pub facility_type: FacilityType,
  pub location:      Location,
  pub capacity:      f64,
  #[serde(default)]
  pub gas_capacity:  Option<f64>,
  #[serde(default = "start_as_draft")]
  pub draft:         bool,
  #[serde(default)]
  pub description:   Option<String>,
}

fn start_as_draft() -> bool { true }

impl NewFacility {
  pub fn new(
    name: impl Into<String>,
    facility_type: FacilityType,
    location: Location,
    capacity: f64,
  ) -> Self {
    Self {
      name: name.into(),
      facility_type,
      location,
      capacity,
      gas_capacity: None,
      draft: start_as_draft(),
      description: None,
    }
  }

  pub fn published(mut self) -> Self {
    self.draft = false;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.name, &self.location, self.capacity, self.gas_capacity)
  }

  pub fn into_facility(self, id: FacilityId, hit: bool) -> Facility {
    Facility {
      id,
      name: self.name,
      facility_type: self.facility_type,
      location: self.location,
      capacity: self.capacity,
      gas_capacity: self.gas_capacity,
      hit,
      draft: self.draft,
      description: self.description,
    }
  }
}

/// A partial update. Absent fields keep their stored value; an explicit
/// `null` clears `gasCapacity` or `description`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityPatch {
  pub name:          Option<String>,
  #[serde(rename = "type")]
  pub facility_type: Option<FacilityType>,
  pub location:      Option<Location>,
  pub capacity:      Option<f64>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub gas_capacity:  Option<Option<f64>>,
  pub draft:         Option<bool>,
  #[serde(default, deserialize_with = "crate::document::nullable", skip_serializing_if = "Option::is_none")]
  pub description:   Option<Option<String>>,
}

fn validate_fields(
  name: &str,
  location: &Location,
  capacity: f64,
  gas_capacity: Option<f64>,
) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::Validation("name must not be empty".into()));
  }
  if !capacity.is_finite() || capacity < 0.0 {
    return Err(Error::Validation(format!(
      "capacity must be a non-negative number, got {capacity}"
    )));
  }
  if let Some(gas) = gas_capacity
    && (!gas.is_finite() || gas < 0.0)
  {
    return Err(Error::Validation(format!(
      "gasCapacity must be a non-negative number, got {gas}"
    )));
  }
  location.validate()
}
