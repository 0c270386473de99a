//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use serde_json::json;

use oilwatch_core::{
  derived::FacilitySummary,
  document::SeedData,
  facility::{FacilityPatch, FacilityType, Location, NewFacility},
  hit::NewHit,
  store::{FacilityStore, ImportSummary, StoreError},
};

use crate::{SqliteStore, migrations};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn refinery(name: &str, capacity: f64) -> NewFacility {
  NewFacility::new(name, FacilityType::Refinery, Location::new(48.5, 44.5), capacity)
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 2, d).unwrap() }

// ─── Facilities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_applies_every_migration() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), migrations::latest_version());
}

#[tokio::test]
async fn create_and_get_facility() {
  let s = store().await;
  let created = s.create_facility(refinery("Volgograd Refinery", 100_000.0)).await.unwrap();
  assert_eq!(created.id, 1);
  assert!(!created.hit);

  let fetched = s.get_facility(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert!(s.get_facility(999).await.unwrap().is_none());
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() {
  let s = store().await;
  let a = s.create_facility(refinery("A", 1.0)).await.unwrap();
  let b = s.create_facility(refinery("B", 1.0)).await.unwrap();
  assert!(s.delete_facility(b.id).await.unwrap());

  let c = s.create_facility(refinery("C", 1.0)).await.unwrap();
  assert_eq!((a.id, b.id, c.id), (1, 2, 3));
}

#[tokio::test]
async fn invalid_facility_is_rejected() {
  let s = store().await;
  let err = s.create_facility(refinery("  ", 1.0)).await.unwrap_err();
  assert!(err.is_invalid());
  assert!(s.list_facilities().await.unwrap().is_empty());
}

#[tokio::test]
async fn put_facility_merges_and_rederives() {
  let s = store().await;
  let mut f = s.create_facility(refinery("A", 1_000.0)).await.unwrap();
  f.apply(FacilityPatch { capacity: Some(2_000.0), ..Default::default() }).unwrap();
  f.hit = true;

  let written = s.put_facility(f).await.unwrap();
  assert_eq!(written.capacity, 2_000.0);
  assert!(!written.hit);
}

// ─── Hits and derived state ──────────────────────────────────────────────────

#[tokio::test]
async fn draft_hits_do_not_mark_facility() {
  let s = store().await;
  let f = s.create_facility(refinery("Volgograd Refinery", 100_000.0)).await.unwrap();

  let h1 = s.create_hit(NewHit::new(f.id, day(1)).with_damage(25.0)).await.unwrap();
  let h2 = s.create_hit(NewHit::new(f.id, day(2)).with_damage(40.0)).await.unwrap();
  s.create_hit(NewHit::new(f.id, day(3)).with_damage(90.0).as_draft()).await.unwrap();

  let facility = s.get_facility(f.id).await.unwrap().unwrap();
  let hits = s.list_hits_by_facility(f.id).await.unwrap();
  let summary = FacilitySummary::new(facility.clone(), &hits);
  assert!(facility.hit);
  assert_eq!(summary.damage_percentage, 65.0);
  assert_eq!(summary.projected_capacity, 35_000.0);

  s.delete_hit(h1.id).await.unwrap();
  let facility = s.get_facility(f.id).await.unwrap().unwrap();
  assert!(facility.hit);

  s.delete_hit(h2.id).await.unwrap();
  let facility = s.get_facility(f.id).await.unwrap().unwrap();
  let hits = s.list_hits_by_facility(f.id).await.unwrap();
  assert!(!facility.hit);
  assert_eq!(FacilitySummary::new(facility, &hits).damage_percentage, 0.0);
}

#[tokio::test]
async fn hits_are_listed_newest_first() {
  let s = store().await;
  let f = s.create_facility(refinery("A", 1.0)).await.unwrap();
  for d in [10, 25, 3] {
    s.create_hit(NewHit::new(f.id, day(d))).await.unwrap();
  }
  let dates: Vec<_> =
    s.list_hits_by_facility(f.id).await.unwrap().into_iter().map(|h| h.date).collect();
  assert_eq!(dates, vec![day(25), day(10), day(3)]);
  assert_eq!(s.list_all_hits().await.unwrap().len(), 3);
}

#[tokio::test]
async fn hit_for_missing_facility_is_not_found() {
  let s = store().await;
  let err = s.create_hit(NewHit::new(7, day(1))).await.unwrap_err();
  assert!(err.is_not_found());
  assert!(s.list_all_hits().await.unwrap().is_empty());
}

#[tokio::test]
async fn moving_a_hit_rederives_both_facilities() {
  let s = store().await;
  let a = s.create_facility(refinery("A", 1.0)).await.unwrap();
  let b = s.create_facility(refinery("B", 1.0)).await.unwrap();
  let mut h = s.create_hit(NewHit::new(a.id, day(1))).await.unwrap();

  h.facility_id = b.id;
  s.put_hit(h).await.unwrap();

  assert!(!s.get_facility(a.id).await.unwrap().unwrap().hit);
  assert!(s.get_facility(b.id).await.unwrap().unwrap().hit);
  assert_eq!(s.list_hits_by_facility(b.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_facility_cascades_to_hits() {
  let s = store().await;
  let a = s.create_facility(refinery("A", 1.0)).await.unwrap();
  let b = s.create_facility(refinery("B", 1.0)).await.unwrap();
  s.create_hit(NewHit::new(a.id, day(1))).await.unwrap();
  s.create_hit(NewHit::new(a.id, day(2))).await.unwrap();
  let kept = s.create_hit(NewHit::new(b.id, day(3))).await.unwrap();

  assert!(s.delete_facility(a.id).await.unwrap());
  let remaining = s.list_all_hits().await.unwrap();
  assert_eq!(remaining, vec![kept]);
  assert!(!s.delete_facility(a.id).await.unwrap());
}

#[tokio::test]
async fn toggled_flag_is_replaced_on_next_hit_write() {
  let s = store().await;
  let f = s.create_facility(refinery("A", 1.0)).await.unwrap();
  assert!(s.set_hit_flag(f.id, true).await.unwrap().unwrap().hit);
  assert!(s.get_facility(f.id).await.unwrap().unwrap().hit);

  s.create_hit(NewHit::new(f.id, day(1)).as_draft()).await.unwrap();
  assert!(!s.get_facility(f.id).await.unwrap().unwrap().hit);
}

// ─── Import and legacy documents ─────────────────────────────────────────────

#[tokio::test]
async fn import_keeps_ids_and_advances_sequences() {
  let s = store().await;
  let seed = SeedData {
    facilities: vec![
      json!({ "id": 10, "name": "Tuapse Refinery", "type": "Refinery",
              "latitude": 44.1, "longitude": 39.07, "capacity": 240000, "hit": true }),
      json!({ "id": 12, "name": "Ust-Luga", "type": "storage",
              "location": { "latitude": 59.68, "longitude": 28.4 }, "capacity": 1 }),
      json!({ "id": 13, "name": "No location", "type": "storage", "capacity": 1 }),
    ],
    hits: vec![
      json!({ "id": 4, "facilityId": 12, "date": "2024-01-21", "videoLink": "https://t.me/c" }),
      json!({ "id": 5, "facilityId": 77, "date": "2024-01-21" }),
    ],
  };

  let summary = s.import_documents(seed).await.unwrap();
  assert_eq!(summary, ImportSummary { facilities: 2, hits: 1, skipped: 2 });

  // No hits reference Tuapse, so its imported flag does not survive.
  assert!(!s.get_facility(10).await.unwrap().unwrap().hit);
  assert!(s.get_facility(12).await.unwrap().unwrap().hit);
  assert_eq!(s.get_hit(4).await.unwrap().unwrap().media_links, vec!["https://t.me/c"]);

  let next = s.create_facility(refinery("Next", 1.0)).await.unwrap();
  assert_eq!(next.id, 13);
  let next_hit = s.create_hit(NewHit::new(next.id, day(1))).await.unwrap();
  assert_eq!(next_hit.id, 5);
}

#[tokio::test]
async fn import_over_existing_hit_refreshes_previous_owner() {
  let s = store().await;
  let a = s.create_facility(refinery("A", 1.0)).await.unwrap();
  let b = s.create_facility(refinery("B", 1.0)).await.unwrap();
  let h = s.create_hit(NewHit::new(a.id, day(1))).await.unwrap();
  assert!(s.get_facility(a.id).await.unwrap().unwrap().hit);

  let seed = SeedData {
    facilities: vec![],
    hits: vec![json!({ "id": h.id, "facilityId": b.id, "date": "2024-02-02" })],
  };
  let summary = s.import_documents(seed).await.unwrap();
  assert_eq!(summary.hits, 1);

  assert!(s.list_hits_by_facility(a.id).await.unwrap().is_empty());
  assert!(!s.get_facility(a.id).await.unwrap().unwrap().hit);
  assert!(s.get_facility(b.id).await.unwrap().unwrap().hit);
}

#[tokio::test]
async fn legacy_documents_are_migrated() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  conn
    .call(|c| Ok(migrations::migrate(c, Some(1))))
    .await
    .unwrap()
    .unwrap();
  conn
    .call(|c| {
      c.execute_batch(
        r#"
        INSERT INTO facilities (id, doc) VALUES
          (1, '{"id":1,"name":"Omsk Refinery","type":"Refinery","lat":54.98,"lng":73.32,"capacity":395000}'),
          (2, '{"name":"Surgut","type":"EXTRACTION","latitude":61.25,"longitude":73.41,"capacity":500000,"hit":true}');
        INSERT INTO hits (id, facility_id, date, doc) VALUES
          (1, 1, '2024-01-21T00:00:00.000Z',
           '{"facilityId":1,"date":"2024-01-21T00:00:00.000Z","videoLink":"https://t.me/x","damagePercentage":20}');
        "#,
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let raw = conn.clone();
  let s = SqliteStore::with_schema(conn, None).await.unwrap();
  assert_eq!(s.schema_version().await.unwrap(), 6);

  let omsk = s.get_facility(1).await.unwrap().unwrap();
  assert!(omsk.hit);
  assert_eq!(omsk.location, Location::new(54.98, 73.32));

  let surgut = s.get_facility(2).await.unwrap().unwrap();
  assert!(!surgut.hit);
  assert_eq!(surgut.facility_type, FacilityType::Extraction);

  let (facility_doc, hit_doc): (String, String) = raw
    .call(|c| {
      let f = c.query_row("SELECT doc FROM facilities WHERE id = 1", [], |r| r.get(0))?;
      let h = c.query_row("SELECT doc FROM hits WHERE id = 1", [], |r| r.get(0))?;
      Ok((f, h))
    })
    .await
    .unwrap();
  let facility_doc: serde_json::Value = serde_json::from_str(&facility_doc).unwrap();
  let hit_doc: serde_json::Value = serde_json::from_str(&hit_doc).unwrap();

  assert_eq!(facility_doc["type"], "refinery");
  assert_eq!(facility_doc["location"]["latitude"], 54.98);
  assert!(facility_doc.get("lat").is_none());
  assert_eq!(hit_doc["mediaLinks"], json!(["https://t.me/x"]));
  assert!(hit_doc.get("videoLink").is_none());
  assert_eq!(hit_doc["draft"], false);
}

#[tokio::test]
async fn undecodable_rows_are_skipped_in_lists() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let raw = conn.clone();
  let s = SqliteStore::with_schema(conn, None).await.unwrap();
  s.create_facility(refinery("Good", 1.0)).await.unwrap();

  raw
    .call(|c| {
      c.execute("INSERT INTO facilities (doc) VALUES ('{\"name\":\"Bad\"}')", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let listed = s.list_facilities().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].name, "Good");
  assert!(s.get_facility(2).await.is_err());
}

#[tokio::test]
async fn closed_connection_is_unavailable() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let raw = conn.clone();
  let s = SqliteStore::with_schema(conn, None).await.unwrap();
  raw.close().await.unwrap();

  let err = s.list_facilities().await.unwrap_err();
  assert!(err.is_unavailable());
  assert!(!err.is_not_found());
}
