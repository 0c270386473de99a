//! [`MemoryStore`], a process-local [`FacilityStore`].
//!
//! Used when no database is configured. All state sits behind one mutex, so
//! each operation, including its hit-flag re-derivation, is atomic.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::warn;

use crate::{
  Error, Result, derived,
  document::{SeedData, decode_facility, decode_hit},
  facility::{Facility, FacilityId, NewFacility},
  hit::{self, Hit, HitId, NewHit},
  store::{FacilityStore, ImportSummary},
};

#[derive(Default)]
struct State {
  facilities:       BTreeMap<FacilityId, Facility>,
  hits:             BTreeMap<HitId, Hit>,
  last_facility_id: FacilityId,
  last_hit_id:      HitId,
}

impl State {
  fn next_facility_id(&mut self) -> FacilityId {
    self.last_facility_id += 1;
    self.last_facility_id
  }

  fn next_hit_id(&mut self) -> HitId {
    self.last_hit_id += 1;
    self.last_hit_id
  }

  fn refresh_flag(&mut self, facility_id: FacilityId) {
    let hits = &self.hits;
    if let Some(facility) = self.facilities.get_mut(&facility_id) {
      derived::reconcile(facility, hits.values());
    }
  }

  fn insert_facility(&mut self, mut facility: Facility) -> Facility {
    facility.hit = derived::hit_flag(facility.id, self.hits.values());
    self.last_facility_id = self.last_facility_id.max(facility.id);
    self.facilities.insert(facility.id, facility.clone());
    facility
  }

  fn insert_hit(&mut self, hit: Hit) -> Result<Hit> {
    if !self.facilities.contains_key(&hit.facility_id) {
      return Err(Error::FacilityNotFound(hit.facility_id));
    }
    self.last_hit_id = self.last_hit_id.max(hit.id);
    let previous = self.hits.insert(hit.id, hit.clone());
    if let Some(previous) = previous
      && previous.facility_id != hit.facility_id
    {
      self.refresh_flag(previous.facility_id);
    }
    self.refresh_flag(hit.facility_id);
    Ok(hit)
  }
}

/// An in-memory store. Cloning is cheap; clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<State>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl FacilityStore for MemoryStore {
  type Error = Error;

  // ── Facilities ────────────────────────────────────────────────────────────

  async fn list_facilities(&self) -> Result<Vec<Facility>> {
    Ok(self.lock().facilities.values().cloned().collect())
  }

  async fn get_facility(&self, id: FacilityId) -> Result<Option<Facility>> {
    Ok(self.lock().facilities.get(&id).cloned())
  }

  async fn create_facility(&self, input: NewFacility) -> Result<Facility> {
    input.validate()?;
    let mut state = self.lock();
    let id = state.next_facility_id();
    Ok(state.insert_facility(input.into_facility(id, false)))
  }

  async fn put_facility(&self, facility: Facility) -> Result<Facility> {
    facility.validate()?;
    Ok(self.lock().insert_facility(facility))
  }

  async fn delete_facility(&self, id: FacilityId) -> Result<bool> {
    let mut state = self.lock();
    if state.facilities.remove(&id).is_none() {
      return Ok(false);
    }
    state.hits.retain(|_, h| h.facility_id != id);
    Ok(true)
  }

  async fn set_hit_flag(&self, id: FacilityId, hit: bool) -> Result<Option<Facility>> {
    let mut state = self.lock();
    Ok(state.facilities.get_mut(&id).map(|f| {
      f.hit = hit;
      f.clone()
    }))
  }

  // ── Hits ──────────────────────────────────────────────────────────────────

  async fn list_hits_by_facility(&self, facility_id: FacilityId) -> Result<Vec<Hit>> {
    let mut hits: Vec<Hit> = self
      .lock()
      .hits
      .values()
      .filter(|h| h.facility_id == facility_id)
      .cloned()
      .collect();
    hit::sort_newest_first(&mut hits);
    Ok(hits)
  }

  async fn list_all_hits(&self) -> Result<Vec<Hit>> {
    let mut hits: Vec<Hit> = self.lock().hits.values().cloned().collect();
    hit::sort_newest_first(&mut hits);
    Ok(hits)
  }

  async fn get_hit(&self, id: HitId) -> Result<Option<Hit>> {
    Ok(self.lock().hits.get(&id).cloned())
  }

  async fn create_hit(&self, input: NewHit) -> Result<Hit> {
    input.validate()?;
    let mut state = self.lock();
    if !state.facilities.contains_key(&input.facility_id) {
      return Err(Error::FacilityNotFound(input.facility_id));
    }
    let id = state.next_hit_id();
    state.insert_hit(input.into_hit(id))
  }

  async fn put_hit(&self, mut hit: Hit) -> Result<Hit> {
    hit.validate()?;
    hit.media_links = hit::normalize_media_links(hit.media_links);
    self.lock().insert_hit(hit)
  }

  async fn delete_hit(&self, id: HitId) -> Result<Option<Hit>> {
    let mut state = self.lock();
    let removed = state.hits.remove(&id);
    if let Some(hit) = &removed {
      state.refresh_flag(hit.facility_id);
    }
    Ok(removed)
  }

  // ── Bulk ──────────────────────────────────────────────────────────────────

  async fn import_documents(&self, seed: SeedData) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut state = self.lock();

    for value in seed.facilities {
      match decode_facility(value, None) {
        Ok(facility) => {
          state.insert_facility(facility);
          summary.facilities += 1;
        }
        Err(e) => {
          warn!(error = %e, "skipping undecodable facility document");
          summary.skipped += 1;
        }
      }
    }

    let mut touched = BTreeSet::new();
    for value in seed.hits {
      let hit = match decode_hit(value, None) {
        Ok(hit) => hit,
        Err(e) => {
          warn!(error = %e, "skipping undecodable hit document");
          summary.skipped += 1;
          continue;
        }
      };
      if !state.facilities.contains_key(&hit.facility_id) {
        warn!(hit = hit.id, facility = hit.facility_id, "skipping hit for unknown facility");
        summary.skipped += 1;
        continue;
      }
      touched.insert(hit.facility_id);
      state.last_hit_id = state.last_hit_id.max(hit.id);
      if let Some(previous) = state.hits.insert(hit.id, hit) {
        touched.insert(previous.facility_id);
      }
      summary.hits += 1;
    }

    for facility_id in touched {
      state.refresh_flag(facility_id);
    }
    Ok(summary)
  }
}
