//! Range rings: approximate iso-distance outlines around a border.
//!
//! Each border point is pushed radially away from a fixed reference centre.
//! Kilometres are converted to degrees with constant per-axis scale factors,
//! which is only reasonable within one latitude band. The output is for map
//! overlays and nothing depends on its geodesic accuracy.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `[latitude, longitude]` in decimal degrees.
pub type LatLon = [f64; 2];

/// Pulls the ring inwards around one compass bearing.
///
/// The reduction peaks at `max_reduction_km` on `center_deg` and falls off
/// linearly to zero at `half_width_deg` on either side. Bearings are measured
/// clockwise from north at the reference centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorReduction {
  pub center_deg:       f64,
  pub half_width_deg:   f64,
  pub max_reduction_km: f64,
}

impl SectorReduction {
  pub fn new(center_deg: f64, half_width_deg: f64, max_reduction_km: f64) -> Self {
    Self { center_deg, half_width_deg, max_reduction_km }
  }

  /// Reduction in km for a point at `bearing_deg`.
  pub fn reduction_at(&self, bearing_deg: f64) -> f64 {
    if self.half_width_deg <= 0.0 {
      return 0.0;
    }
    let offset = angular_distance(bearing_deg, self.center_deg);
    if offset > self.half_width_deg {
      return 0.0;
    }
    self.max_reduction_km * (1.0 - offset / self.half_width_deg)
  }

  /// Keeps the rings off the landmass to the east and south of the default
  /// centre: east-northeast, east, southeast and south.
  pub fn eastern_preset() -> Vec<Self> {
    vec![
      Self::new(67.5, 22.5, 100.0),
      Self::new(90.0, 45.0, 300.0),
      Self::new(135.0, 45.0, 300.0),
      Self::new(180.0, 45.0, 300.0),
    ]
  }
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
fn angular_distance(a: f64, b: f64) -> f64 {
  let diff = (a - b).rem_euclid(360.0);
  diff.min(360.0 - diff)
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRingConfig {
  /// Fixed reference centre the offsets radiate from.
  pub center:             LatLon,
  pub km_per_degree_lat:  f64,
  /// Only valid near the centre's latitude.
  pub km_per_degree_lon:  f64,
  /// Intermediate points inserted per border segment, counting its start.
  pub points_per_segment: usize,
  pub sectors:            Vec<SectorReduction>,
}

impl Default for RangeRingConfig {
  fn default() -> Self {
    Self {
      center:             [48.5, 31.5],
      km_per_degree_lat:  111.0,
      km_per_degree_lon:  70.0,
      points_per_segment: 5,
      sectors:            Vec::new(),
    }
  }
}

impl RangeRingConfig {
  pub fn with_sectors(mut self, sectors: Vec<SectorReduction>) -> Self {
    self.sectors = sectors;
    self
  }

  fn reduction_at(&self, bearing_deg: f64) -> f64 {
    self.sectors.iter().map(|s| s.reduction_at(bearing_deg)).sum()
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Linearly interpolate `points_per_segment - 1` points inside every segment.
///
/// Each segment contributes its start point plus the interpolated points; the
/// final input point is appended once at the end.
pub fn densify(border: &[LatLon], points_per_segment: usize) -> Vec<LatLon> {
  let steps = points_per_segment.max(1);
  let mut out = Vec::with_capacity(border.len().saturating_sub(1) * steps + 1);

  for pair in border.windows(2) {
    let [a, b] = [pair[0], pair[1]];
    for j in 0..steps {
      let t = j as f64 / steps as f64;
      out.push([a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]);
    }
  }
  if let Some(last) = border.last() {
    out.push(*last);
  }
  out
}

/// Bearing of `point` as seen from `center`, clockwise from north, in
/// `(-180, 180]`.
pub fn bearing_deg(center: LatLon, point: LatLon) -> f64 {
  let d_lat = point[0] - center[0];
  let d_lon = point[1] - center[1];
  d_lon.atan2(d_lat).to_degrees()
}

/// Reject a border with fewer than two points or non-finite coordinates, and
/// any distance that is negative or non-finite.
pub fn validate_ring_input(border: &[LatLon], distances_km: &[f64]) -> Result<()> {
  if border.len() < 2 {
    return Err(Error::Validation("border needs at least two points".into()));
  }
  if border.iter().flatten().any(|c| !c.is_finite()) {
    return Err(Error::Validation("border coordinates must be finite".into()));
  }
  if let Some(d) = distances_km.iter().find(|d| !d.is_finite() || **d < 0.0) {
    return Err(Error::Validation(format!("invalid ring distance {d}")));
  }
  Ok(())
}

/// Offset `border` outwards by `distance_km`, returning a closed ring.
///
/// Points sitting exactly on the centre have no direction and are skipped.
/// Sector reductions never push a point inwards past the border itself.
pub fn range_ring(border: &[LatLon], distance_km: f64, config: &RangeRingConfig) -> Vec<LatLon> {
  let center = config.center;
  let mut ring: Vec<LatLon> = densify(border, config.points_per_segment)
    .into_iter()
    .filter_map(|point| {
      let d_lat = point[0] - center[0];
      let d_lon = point[1] - center[1];
      let length = d_lat.hypot(d_lon);
      if length == 0.0 {
        return None;
      }

      let reduction = config.reduction_at(bearing_deg(center, point));
      let offset = (distance_km - reduction).max(0.0);

      Some([
        point[0] + d_lat / length * offset / config.km_per_degree_lat,
        point[1] + d_lon / length * offset / config.km_per_degree_lon,
      ])
    })
    .collect();

  if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied())
    && first != last
  {
    ring.push(first);
  }
  ring
}
