//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use oilwatch_core::store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by what it means to a client.
  pub fn store<E: StoreError>(e: E) -> Self {
    if e.is_not_found() {
      Self::NotFound(e.to_string())
    } else if e.is_invalid() {
      Self::BadRequest(e.to_string())
    } else {
      Self::Store(Box::new(e))
    }
  }
}

impl From<oilwatch_core::Error> for ApiError {
  fn from(e: oilwatch_core::Error) -> Self {
    match e {
      oilwatch_core::Error::Validation(_) | oilwatch_core::Error::InvalidDate(_) => {
        Self::BadRequest(e.to_string())
      }
      other => Self::store(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "message": message }))).into_response()
  }
}

/// Pass a list through, or an empty one if the store cannot be reached.
pub(crate) fn or_empty<T, E: StoreError>(
  result: Result<Vec<T>, E>,
  what: &str,
) -> Result<Vec<T>, ApiError> {
  match result {
    Ok(items) => Ok(items),
    Err(e) if e.is_unavailable() => {
      warn!(error = %e, "{what} unavailable, serving an empty list");
      Ok(Vec::new())
    }
    Err(e) => Err(ApiError::store(e)),
  }
}
