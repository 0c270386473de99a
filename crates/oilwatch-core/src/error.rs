//! Error types for `oilwatch-core`.

use thiserror::Error;

use crate::{facility::FacilityId, hit::HitId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("facility not found: {0}")]
  FacilityNotFound(FacilityId),

  #[error("hit not found: {0}")]
  HitNotFound(HitId),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("persistence unavailable: {0}")]
  PersistenceUnavailable(String),

  #[error("document has no id")]
  MissingId,

  #[error("invalid date {0:?}")]
  InvalidDate(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
