//! The SQLite implementation of [`FacilityStore`].

use std::{collections::BTreeSet, path::Path};

use rusqlite::{Connection, Transaction};
use tracing::{debug, warn};

use oilwatch_core::{
  Error as CoreError,
  document::{SeedData, decode_facility, decode_hit},
  facility::{Facility, FacilityId, NewFacility},
  hit::{self, Hit, HitId, NewHit},
  store::{FacilityStore, ImportSummary},
};

use crate::{Result, encode, migrations};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Oilwatch store backed by a single SQLite file.
///
/// Clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_schema(conn, None).await
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_schema(conn, None).await
  }

  /// Migrate `conn` up to `target` (default: latest) and wrap it.
  pub(crate) async fn with_schema(
    conn: tokio_rusqlite::Connection,
    target: Option<u32>,
  ) -> Result<Self> {
    let version = conn.call(move |c| Ok(migrations::migrate(c, target))).await??;
    debug!(version, "sqlite schema ready");
    Ok(Self { conn })
  }

  pub async fn schema_version(&self) -> Result<u32> {
    self.read(|c| migrations::schema_version(c)).await
  }

  /// Run `f` against the connection on the database thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }
}

// ─── FacilityStore impl ──────────────────────────────────────────────────────

impl FacilityStore for SqliteStore {
  type Error = crate::Error;

  // ── Facilities ────────────────────────────────────────────────────────────

  async fn list_facilities(&self) -> Result<Vec<Facility>> {
    self.read(|c| encode::load_facilities(c)).await
  }

  async fn get_facility(&self, id: FacilityId) -> Result<Option<Facility>> {
    self.read(move |c| encode::load_facility(c, id)).await
  }

  async fn create_facility(&self, input: NewFacility) -> Result<Facility> {
    input.validate()?;
    self
      .write(move |tx| {
        let id = encode::reserve_facility_id(tx)?;
        let facility = input.into_facility(id, false);
        encode::save_facility(tx, &facility)?;
        Ok(facility)
      })
      .await
  }

  async fn put_facility(&self, mut facility: Facility) -> Result<Facility> {
    facility.validate()?;
    self
      .write(move |tx| {
        let hits = encode::load_hits(tx, Some(facility.id))?;
        oilwatch_core::derived::reconcile(&mut facility, &hits);
        encode::save_facility(tx, &facility)?;
        Ok(facility)
      })
      .await
  }

  async fn delete_facility(&self, id: FacilityId) -> Result<bool> {
    self
      .write(move |tx| {
        if tx.execute("DELETE FROM facilities WHERE id = ?1", [id])? == 0 {
          return Ok(false);
        }
        let removed = tx.execute("DELETE FROM hits WHERE facility_id = ?1", [id])?;
        debug!(facility = id, hits = removed, "cascaded facility delete");
        Ok(true)
      })
      .await
  }

  async fn set_hit_flag(&self, id: FacilityId, hit: bool) -> Result<Option<Facility>> {
    self
      .write(move |tx| {
        let Some(mut facility) = encode::load_facility(tx, id)? else {
          return Ok(None);
        };
        facility.hit = hit;
        encode::save_facility(tx, &facility)?;
        Ok(Some(facility))
      })
      .await
  }

  // ── Hits ──────────────────────────────────────────────────────────────────

  async fn list_hits_by_facility(&self, facility_id: FacilityId) -> Result<Vec<Hit>> {
    self.read(move |c| encode::load_hits(c, Some(facility_id))).await
  }

  async fn list_all_hits(&self) -> Result<Vec<Hit>> {
    self.read(|c| encode::load_hits(c, None)).await
  }

  async fn get_hit(&self, id: HitId) -> Result<Option<Hit>> {
    self.read(move |c| encode::load_hit(c, id)).await
  }

  async fn create_hit(&self, input: NewHit) -> Result<Hit> {
    input.validate()?;
    self
      .write(move |tx| {
        if !encode::facility_exists(tx, input.facility_id)? {
          return Err(CoreError::FacilityNotFound(input.facility_id).into());
        }
        let id = encode::reserve_hit_id(tx, input.facility_id)?;
        let hit = input.into_hit(id);
        encode::save_hit(tx, &hit)?;
        encode::refresh_flag(tx, hit.facility_id)?;
        Ok(hit)
      })
      .await
  }

  async fn put_hit(&self, mut hit: Hit) -> Result<Hit> {
    hit.validate()?;
    hit.media_links = hit::normalize_media_links(hit.media_links);
    self
      .write(move |tx| {
        if !encode::facility_exists(tx, hit.facility_id)? {
          return Err(CoreError::FacilityNotFound(hit.facility_id).into());
        }
        let previous_owner = encode::hit_owner(tx, hit.id)?;
        encode::save_hit(tx, &hit)?;
        if let Some(previous) = previous_owner
          && previous != hit.facility_id
        {
          encode::refresh_flag(tx, previous)?;
        }
        encode::refresh_flag(tx, hit.facility_id)?;
        Ok(hit)
      })
      .await
  }

  async fn delete_hit(&self, id: HitId) -> Result<Option<Hit>> {
    self
      .write(move |tx| {
        let Some(hit) = encode::load_hit(tx, id)? else {
          return Ok(None);
        };
        tx.execute("DELETE FROM hits WHERE id = ?1", [id])?;
        encode::refresh_flag(tx, hit.facility_id)?;
        Ok(Some(hit))
      })
      .await
  }

  // ── Bulk ──────────────────────────────────────────────────────────────────

  async fn import_documents(&self, seed: SeedData) -> Result<ImportSummary> {
    self
      .write(move |tx| {
        let mut summary = ImportSummary::default();
        let mut touched = BTreeSet::new();

        for value in seed.facilities {
          match decode_facility(value, None) {
            Ok(facility) => {
              encode::save_facility(tx, &facility)?;
              touched.insert(facility.id);
              summary.facilities += 1;
            }
            Err(e) => {
              warn!(error = %e, "skipping undecodable facility document");
              summary.skipped += 1;
            }
          }
        }

        for value in seed.hits {
          let hit = match decode_hit(value, None) {
            Ok(hit) => hit,
            Err(e) => {
              warn!(error = %e, "skipping undecodable hit document");
              summary.skipped += 1;
              continue;
            }
          };
          if !encode::facility_exists(tx, hit.facility_id)? {
            warn!(hit = hit.id, facility = hit.facility_id, "skipping hit for unknown facility");
            summary.skipped += 1;
            continue;
          }
          if let Some(previous) = encode::hit_owner(tx, hit.id)? {
            touched.insert(previous);
          }
          encode::save_hit(tx, &hit)?;
          touched.insert(hit.facility_id);
          summary.hits += 1;
        }

        for facility_id in touched {
          encode::refresh_flag(tx, facility_id)?;
        }
        Ok(summary)
      })
      .await
  }
}
