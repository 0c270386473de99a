//! Error type for `oilwatch-store-sqlite`.

use oilwatch_core::store::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] oilwatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("schema version {found} is newer than this build supports ({supported})")]
  SchemaTooNew { found: u32, supported: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn sqlite_unavailable(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

impl StoreError for Error {
  fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_not_found())
  }

  fn is_invalid(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_invalid())
  }

  fn is_unavailable(&self) -> bool {
    match self {
      Self::Core(e) => e.is_unavailable(),
      Self::Database(tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_)) => {
        true
      }
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) | Self::Sqlite(e) => sqlite_unavailable(e),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use rusqlite::ffi;

  use super::*;

  fn sqlite(code: i32) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
  }

  #[test]
  fn busy_and_locked_databases_are_unavailable() {
    assert!(Error::Sqlite(sqlite(ffi::SQLITE_BUSY)).is_unavailable());
    assert!(Error::Sqlite(sqlite(ffi::SQLITE_LOCKED)).is_unavailable());
    assert!(Error::Database(tokio_rusqlite::Error::Rusqlite(sqlite(ffi::SQLITE_CANTOPEN))).is_unavailable());
    assert!(Error::Database(tokio_rusqlite::Error::ConnectionClosed).is_unavailable());
  }

  #[test]
  fn other_failures_are_classified_by_meaning() {
    assert!(!Error::Sqlite(sqlite(ffi::SQLITE_CONSTRAINT)).is_unavailable());
    assert!(!Error::SchemaTooNew { found: 9, supported: 6 }.is_unavailable());

    let missing = Error::Core(oilwatch_core::Error::FacilityNotFound(3));
    assert!(missing.is_not_found());
    assert!(!missing.is_unavailable());

    let invalid = Error::Core(oilwatch_core::Error::Validation("name".into()));
    assert!(invalid.is_invalid());
  }
}
