//! Versioned, forward-only schema and document migrations.
//!
//! The applied version is tracked in `PRAGMA user_version`. Each step runs in
//! its own transaction together with the version bump, and every document
//! rewrite is a no-op on documents that are already canonical, so re-running a
//! step is harmless.

use rusqlite::{Connection, Transaction, params};
use serde_json::{Map, Value};
use tracing::{info, warn};

use oilwatch_core::facility::FacilityId;

use crate::{Error, Result, encode};

pub struct Migration {
  pub version: u32,
  pub name:    &'static str,
  pub apply:   fn(&Transaction<'_>) -> Result<()>,
}

pub const MIGRATIONS: &[Migration] = &[
  Migration { version: 1, name: "create collections", apply: create_collections },
  Migration { version: 2, name: "nest facility locations", apply: nest_locations },
  Migration { version: 3, name: "lowercase facility types", apply: lowercase_types },
  Migration { version: 4, name: "media links", apply: media_links },
  Migration { version: 5, name: "backfill draft flags", apply: backfill_drafts },
  Migration { version: 6, name: "re-derive hit flags", apply: rederive_hit_flags },
];

pub fn latest_version() -> u32 { MIGRATIONS.last().map_or(0, |m| m.version) }

pub fn schema_version(conn: &Connection) -> Result<u32> {
  Ok(conn.pragma_query_value(None, "user_version", |r| r.get(0))?)
}

/// Apply every pending migration up to `target` (default: the latest).
/// Returns the resulting schema version.
pub fn migrate(conn: &mut Connection, target: Option<u32>) -> Result<u32> {
  conn.execute_batch("PRAGMA journal_mode = WAL;")?;

  let supported = latest_version();
  let mut version = schema_version(conn)?;
  if version > supported {
    return Err(Error::SchemaTooNew { found: version, supported });
  }

  let start = version;
  let target = target.unwrap_or(supported);
  for m in MIGRATIONS.iter().filter(|m| m.version > start && m.version <= target) {
    info!(version = m.version, name = m.name, "applying migration");
    let tx = conn.transaction()?;
    (m.apply)(&tx)?;
    tx.pragma_update(None, "user_version", m.version)?;
    tx.commit()?;
    version = m.version;
  }
  Ok(version)
}

// ─── Steps ───────────────────────────────────────────────────────────────────

fn create_collections(tx: &Transaction<'_>) -> Result<()> {
  tx.execute_batch(
    "
    CREATE TABLE IF NOT EXISTS facilities (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        doc  TEXT NOT NULL
    );

    -- facility_id and date mirror the document for lookups and ordering.
    CREATE TABLE IF NOT EXISTS hits (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        facility_id INTEGER NOT NULL,
        date        TEXT NOT NULL,
        doc         TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS hits_facility_idx ON hits(facility_id);
    ",
  )?;
  Ok(())
}

fn nest_locations(tx: &Transaction<'_>) -> Result<()> {
  let n = rewrite_docs(tx, "facilities", nest_location)?;
  info!(rewritten = n, "nested facility locations");
  Ok(())
}

fn lowercase_types(tx: &Transaction<'_>) -> Result<()> {
  let n = rewrite_docs(tx, "facilities", lowercase_type)?;
  info!(rewritten = n, "lowercased facility types");
  Ok(())
}

fn media_links(tx: &Transaction<'_>) -> Result<()> {
  let n = rewrite_docs(tx, "hits", merge_media_links)?;
  info!(rewritten = n, "converted hit media links");
  Ok(())
}

fn backfill_drafts(tx: &Transaction<'_>) -> Result<()> {
  let facilities = rewrite_docs(tx, "facilities", backfill_draft)?;
  let hits = rewrite_docs(tx, "hits", backfill_draft)?;
  info!(facilities, hits, "backfilled draft flags");
  Ok(())
}

fn rederive_hit_flags(tx: &Transaction<'_>) -> Result<()> {
  let ids: Vec<FacilityId> = {
    let mut stmt = tx.prepare("SELECT id FROM facilities")?;
    stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?
  };

  let mut changed = 0;
  for id in ids {
    match encode::refresh_flag(tx, id) {
      Ok(true) => changed += 1,
      Ok(false) => {}
      Err(Error::Core(e)) => warn!(facility = id, error = %e, "cannot re-derive hit flag"),
      Err(e) => return Err(e),
    }
  }
  info!(changed, "re-derived hit flags");
  Ok(())
}

// ─── Document rewriting ──────────────────────────────────────────────────────

/// Run `edit` over every JSON object document in `table`, writing back the
/// ones it reports as changed. Returns the number rewritten.
fn rewrite_docs(
  tx: &Transaction<'_>,
  table: &str,
  edit: fn(&mut Map<String, Value>) -> bool,
) -> Result<usize> {
  let rows: Vec<(i64, String)> = {
    let mut stmt = tx.prepare(&format!("SELECT id, doc FROM {table}"))?;
    stmt
      .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
      .collect::<rusqlite::Result<_>>()?
  };

  let update = format!("UPDATE {table} SET doc = ?1 WHERE id = ?2");
  let mut rewritten = 0;
  for (id, doc) in rows {
    let mut value: Value = match serde_json::from_str(&doc) {
      Ok(v) => v,
      Err(e) => {
        warn!(table, id, error = %e, "leaving unparsable document untouched");
        continue;
      }
    };
    let Some(object) = value.as_object_mut() else {
      warn!(table, id, "leaving non-object document untouched");
      continue;
    };
    if edit(object) {
      tx.execute(&update, params![value.to_string(), id])?;
      rewritten += 1;
    }
  }
  Ok(rewritten)
}

fn nest_location(doc: &mut Map<String, Value>) -> bool {
  if doc.contains_key("location") {
    return false;
  }
  let Some((lat_key, lon_key)) = [("latitude", "longitude"), ("lat", "lng")]
    .into_iter()
    .find(|(lat, lon)| doc.contains_key(*lat) && doc.contains_key(*lon))
  else {
    return false;
  };

  let latitude = doc.remove(lat_key).unwrap_or(Value::Null);
  let longitude = doc.remove(lon_key).unwrap_or(Value::Null);
  let mut location = Map::new();
  location.insert("latitude".into(), latitude);
  location.insert("longitude".into(), longitude);
  doc.insert("location".into(), Value::Object(location));
  true
}

fn lowercase_type(doc: &mut Map<String, Value>) -> bool {
  let Some(Value::String(t)) = doc.get_mut("type") else {
    return false;
  };
  let lower = t.trim().to_lowercase();
  if *t == lower {
    return false;
  }
  *t = lower;
  true
}

fn is_link(v: &Value) -> bool { v.as_str().is_some_and(|s| !s.trim().is_empty()) }

fn merge_media_links(doc: &mut Map<String, Value>) -> bool {
  let legacy = doc.remove("videoLink");
  let mut changed = legacy.is_some();

  if !doc.contains_key("mediaLinks") {
    let links: Vec<Value> = legacy.into_iter().filter(is_link).collect();
    doc.insert("mediaLinks".into(), Value::Array(links));
    changed = true;
  }
  if let Some(Value::Array(links)) = doc.get_mut("mediaLinks") {
    let before = links.len();
    links.retain(is_link);
    changed |= links.len() != before;
  }
  changed
}

fn backfill_draft(doc: &mut Map<String, Value>) -> bool {
  if doc.get("draft").is_some_and(|v| !v.is_null()) {
    return false;
  }
  doc.insert("draft".into(), Value::Bool(false));
  true
}
