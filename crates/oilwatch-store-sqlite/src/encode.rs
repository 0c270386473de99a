//! Row-level helpers shared by the store and the migrations.
//!
//! Every function takes a plain `&Connection` so it can run either directly
//! or through a `Transaction` (which derefs to one).

use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::warn;

use oilwatch_core::{
  derived,
  document::{decode_facility_str, decode_hit_str},
  facility::{Facility, FacilityId},
  hit::{self, Hit, HitId},
};

use crate::Result;

// ─── Facilities ──────────────────────────────────────────────────────────────

pub(crate) fn facility_exists(conn: &Connection, id: FacilityId) -> Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM facilities WHERE id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

pub(crate) fn load_facility(conn: &Connection, id: FacilityId) -> Result<Option<Facility>> {
  let doc: Option<String> = conn
    .query_row("SELECT doc FROM facilities WHERE id = ?1", params![id], |r| r.get(0))
    .optional()?;
  Ok(doc.map(|doc| decode_facility_str(&doc, Some(id))).transpose()?)
}

/// All decodable facilities in id order.
pub(crate) fn load_facilities(conn: &Connection) -> Result<Vec<Facility>> {
  let mut stmt = conn.prepare("SELECT id, doc FROM facilities ORDER BY id")?;
  let rows = stmt
    .query_map([], |r| Ok((r.get::<_, FacilityId>(0)?, r.get::<_, String>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(
    rows
      .into_iter()
      .filter_map(|(id, doc)| match decode_facility_str(&doc, Some(id)) {
        Ok(f) => Some(f),
        Err(e) => {
          warn!(facility = id, error = %e, "skipping undecodable facility document");
          None
        }
      })
      .collect(),
  )
}

/// Insert or replace by id.
pub(crate) fn save_facility(conn: &Connection, facility: &Facility) -> Result<()> {
  let doc = serde_json::to_string(facility)?;
  conn.execute(
    "INSERT INTO facilities (id, doc) VALUES (?1, ?2)
     ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
    params![facility.id, doc],
  )?;
  Ok(())
}

/// Reserve the next id from the table's AUTOINCREMENT sequence. The row is
/// filled in by a following [`save_facility`] in the same transaction.
pub(crate) fn reserve_facility_id(conn: &Connection) -> Result<FacilityId> {
  conn.execute("INSERT INTO facilities (doc) VALUES ('{}')", [])?;
  Ok(conn.last_insert_rowid())
}

// ─── Hits ────────────────────────────────────────────────────────────────────

pub(crate) fn load_hit(conn: &Connection, id: HitId) -> Result<Option<Hit>> {
  let doc: Option<String> = conn
    .query_row("SELECT doc FROM hits WHERE id = ?1", params![id], |r| r.get(0))
    .optional()?;
  Ok(doc.map(|doc| decode_hit_str(&doc, Some(id))).transpose()?)
}

/// The owning facility recorded in the row, without decoding the document.
pub(crate) fn hit_owner(conn: &Connection, id: HitId) -> Result<Option<FacilityId>> {
  Ok(
    conn
      .query_row("SELECT facility_id FROM hits WHERE id = ?1", params![id], |r| r.get(0))
      .optional()?,
  )
}

/// Decodable hits, newest first, optionally restricted to one facility.
pub(crate) fn load_hits(conn: &Connection, facility_id: Option<FacilityId>) -> Result<Vec<Hit>> {
  let rows = match facility_id {
    Some(fid) => {
      let mut stmt = conn.prepare("SELECT id, doc FROM hits WHERE facility_id = ?1")?;
      stmt
        .query_map(params![fid], |r| Ok((r.get::<_, HitId>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
    None => {
      let mut stmt = conn.prepare("SELECT id, doc FROM hits")?;
      stmt
        .query_map([], |r| Ok((r.get::<_, HitId>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
  };

  let mut hits: Vec<Hit> = rows
    .into_iter()
    .filter_map(|(id, doc)| match decode_hit_str(&doc, Some(id)) {
      Ok(h) => Some(h),
      Err(e) => {
        warn!(hit = id, error = %e, "skipping undecodable hit document");
        None
      }
    })
    .collect();
  hit::sort_newest_first(&mut hits);
  Ok(hits)
}

pub(crate) fn save_hit(conn: &Connection, hit: &Hit) -> Result<()> {
  let doc = serde_json::to_string(hit)?;
  conn.execute(
    "INSERT INTO hits (id, facility_id, date, doc) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(id) DO UPDATE SET
       facility_id = excluded.facility_id,
       date        = excluded.date,
       doc         = excluded.doc",
    params![hit.id, hit.facility_id, hit.date.to_string(), doc],
  )?;
  Ok(())
}

pub(crate) fn reserve_hit_id(conn: &Connection, facility_id: FacilityId) -> Result<HitId> {
  conn.execute(
    "INSERT INTO hits (facility_id, date, doc) VALUES (?1, '', '{}')",
    params![facility_id],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── Derived state ───────────────────────────────────────────────────────────

/// Re-derive one facility's `hit` flag from its stored hits and write it back
/// if it changed. A missing facility is a no-op.
pub(crate) fn refresh_flag(conn: &Connection, facility_id: FacilityId) -> Result<bool> {
  let Some(mut facility) = load_facility(conn, facility_id)? else {
    return Ok(false);
  };
  let hits = load_hits(conn, Some(facility_id))?;
  let changed = derived::reconcile(&mut facility, &hits);
  if changed {
    save_facility(conn, &facility)?;
  }
  Ok(changed)
}
