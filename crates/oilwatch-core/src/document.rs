//! Stored-document shapes and their normalisation.
//!
//! The collections have accumulated several record layouts over time. Each
//! variation is modelled here as an untagged union, and a document is turned
//! into the canonical [`Facility`] / [`Hit`] exactly once, right after
//! deserialisation. Nothing past this module ever sees a legacy shape.
//!
//! | Field | Accepted encodings |
//! |-------|--------------------|
//! | facility location | `location: {latitude, longitude}`, flat `latitude`/`longitude`, flat `lat`/`lng` |
//! | facility `type` | any letter case |
//! | hit media | `mediaLinks: [...]`, single `videoLink` |
//! | hit `date` | `YYYY-MM-DD` or a full ISO-8601 timestamp |
//! | `draft` / `hit` | missing means `false` |

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
  Error, Result,
  facility::{Facility, FacilityId, FacilityType, Location},
  hit::{Hit, HitId, Severity, normalize_media_links},
};

// ─── Tagged unions ───────────────────────────────────────────────────────────

/// The three historical ways a facility position was written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationEncoding {
  Nested { location: Location },
  Flat { latitude: f64, longitude: f64 },
  Short { lat: f64, lng: f64 },
}

impl LocationEncoding {
  pub fn normalize(self) -> Location {
    match self {
      Self::Nested { location } => location,
      Self::Flat { latitude, longitude } => Location { latitude, longitude },
      Self::Short { lat, lng } => Location { latitude: lat, longitude: lng },
    }
  }
}

/// Hit media: the current list, the single legacy link, or nothing at all.
///
/// List entries are kept loose so a stray `null` or number drops only that
/// entry rather than failing the variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MediaEncoding {
  Links {
    #[serde(rename = "mediaLinks")]
    media_links: Vec<Value>,
  },
  Legacy {
    #[serde(rename = "videoLink")]
    video_link: String,
  },
  Absent {},
}

impl MediaEncoding {
  pub fn normalize(self) -> Vec<String> {
    match self {
      Self::Links { media_links } => {
        let links = media_links
          .into_iter()
          .filter_map(|link| match link {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => {
              warn!(entry = %other, "dropping non-string media link");
              None
            }
          })
          .collect();
        normalize_media_links(links)
      }
      Self::Legacy { video_link } => normalize_media_links(vec![video_link]),
      Self::Absent {} => Vec::new(),
    }
  }
}

// ─── Facility documents ──────────────────────────────────────────────────────

/// A facility document as it may appear in the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDocument {
  #[serde(default)]
  pub id:            Option<FacilityId>,
  pub name:          String,
  #[serde(rename = "type")]
  pub facility_type: FacilityType,
  #[serde(flatten)]
  pub location:      LocationEncoding,
  #[serde(default)]
  pub capacity:      f64,
  #[serde(default)]
  pub gas_capacity:  Option<f64>,
  #[serde(default)]
  pub hit:           Option<bool>,
  #[serde(default)]
  pub draft:         Option<bool>,
  #[serde(default)]
  pub description:   Option<String>,
}

impl FacilityDocument {
  /// Normalise into a [`Facility`]. The store key, when given, wins over an
  /// id embedded in the body.
  pub fn into_facility(self, key: Option<FacilityId>) -> Result<Facility> {
    let id = key.or(self.id).ok_or(Error::MissingId)?;
    Ok(Facility {
      id,
      name: self.name,
      facility_type: self.facility_type,
      location: self.location.normalize(),
      capacity: self.capacity,
      gas_capacity: self.gas_capacity,
      hit: self.hit.unwrap_or(false),
      draft: self.draft.unwrap_or(false),
      description: self.description.filter(|d| !d.trim().is_empty()),
    })
  }
}

pub fn decode_facility(value: Value, key: Option<FacilityId>) -> Result<Facility> {
  let doc: FacilityDocument = serde_json::from_value(value)?;
  doc.into_facility(key)
}

pub fn decode_facility_str(json: &str, key: Option<FacilityId>) -> Result<Facility> {
  let doc: FacilityDocument = serde_json::from_str(json)?;
  doc.into_facility(key)
}

// ─── Hit documents ───────────────────────────────────────────────────────────

/// A hit document as it may appear in the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitDocument {
  #[serde(default)]
  pub id:                   Option<HitId>,
  pub facility_id:          FacilityId,
  pub date:                 String,
  #[serde(default)]
  pub severity:             Option<String>,
  #[serde(default)]
  pub damage_percentage:    Option<f64>,
  #[serde(flatten)]
  pub media:                MediaEncoding,
  /// Older editors stored this as an arbitrary JS number.
  #[serde(default)]
  pub expected_repair_time: Option<f64>,
  #[serde(default)]
  pub notes:                Option<String>,
  #[serde(default)]
  pub draft:                Option<bool>,
}

impl HitDocument {
  pub fn into_hit(self, key: Option<HitId>) -> Result<Hit> {
    let id = key.or(self.id).ok_or(Error::MissingId)?;
    let severity = self
      .severity
      .filter(|s| !s.trim().is_empty())
      .map(|s| {
        s.trim()
          .parse::<Severity>()
          .map_err(|_| Error::Validation(format!("unknown severity {s:?}")))
      })
      .transpose()?;

    Ok(Hit {
      id,
      facility_id: self.facility_id,
      date: parse_date(&self.date)?,
      severity,
      damage_percentage: self.damage_percentage,
      media_links: self.media.normalize(),
      expected_repair_time: self
        .expected_repair_time
        .filter(|days| days.is_finite() && *days >= 0.0)
        .map(|days| days.round() as u32),
      notes: self.notes.filter(|n| !n.trim().is_empty()),
      draft: self.draft.unwrap_or(false),
    })
  }
}

pub fn decode_hit(value: Value, key: Option<HitId>) -> Result<Hit> {
  let doc: HitDocument = serde_json::from_value(value)?;
  doc.into_hit(key)
}

pub fn decode_hit_str(json: &str, key: Option<HitId>) -> Result<Hit> {
  let doc: HitDocument = serde_json::from_str(json)?;
  doc.into_hit(key)
}

/// Accept a bare date or any timestamp that starts with one.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
  let trimmed = raw.trim();
  trimmed
    .get(..10)
    .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
    .ok_or_else(|| Error::InvalidDate(raw.to_owned()))
}

/// For patch fields that can be cleared: absent stays `None` (via
/// `#[serde(default)]`), `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Seed data ───────────────────────────────────────────────────────────────

/// A bulk export/import payload: raw documents of either collection, in any
/// historical shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
  #[serde(default)]
  pub facilities: Vec<Value>,
  #[serde(default)]
  pub hits:       Vec<Value>,
}
