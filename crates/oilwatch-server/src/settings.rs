//! Runtime configuration, read from a TOML file overlaid by `OILWATCH_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `OILWATCH_RANGE_RING__EASTERN_SECTORS=true`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File};
use oilwatch_core::geometry::{LatLon, RangeRingConfig, SectorReduction};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite file. Without it the server runs on an in-memory store.
  pub store_path: Option<PathBuf>,
  /// Documents to load at startup when the store is empty.
  pub seed_file:  Option<PathBuf>,
  pub range_ring: RangeRingSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       5000,
      store_path: None,
      seed_file:  None,
      range_ring: RangeRingSettings::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RangeRingSettings {
  pub center:             LatLon,
  pub km_per_degree_lat:  f64,
  pub km_per_degree_lon:  f64,
  pub points_per_segment: usize,
  /// Enable the built-in east/south reduction sectors.
  pub eastern_sectors:    bool,
  /// Additional sectors, applied on top of the built-in ones.
  pub sectors:            Vec<SectorReduction>,
}

impl Default for RangeRingSettings {
  fn default() -> Self {
    let base = RangeRingConfig::default();
    Self {
      center:             base.center,
      km_per_degree_lat:  base.km_per_degree_lat,
      km_per_degree_lon:  base.km_per_degree_lon,
      points_per_segment: base.points_per_segment,
      eastern_sectors:    false,
      sectors:            base.sectors,
    }
  }
}

impl RangeRingSettings {
  pub fn to_config(&self) -> RangeRingConfig {
    let mut sectors =
      if self.eastern_sectors { SectorReduction::eastern_preset() } else { Vec::new() };
    sectors.extend(self.sectors.iter().copied());

    RangeRingConfig {
      center: self.center,
      km_per_degree_lat: self.km_per_degree_lat,
      km_per_degree_lon: self.km_per_degree_lon,
      points_per_segment: self.points_per_segment,
      sectors,
    }
  }
}

/// Read `path` (optional) and the environment into a [`ServerConfig`].
pub fn load(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = Config::builder()
    .add_source(File::from(path.to_path_buf()).required(false))
    .add_source(
      Environment::with_prefix("OILWATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  cfg.store_path = cfg.store_path.as_deref().map(expand_tilde);
  cfg.seed_file = cfg.seed_file.as_deref().map(expand_tilde);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
