//! The `FacilityStore` trait.
//!
//! The trait is implemented by storage backends (`oilwatch-store-sqlite`, and
//! [`crate::memory::MemoryStore`] for running without a database). Higher
//! layers (`oilwatch-api`, `oilwatch-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{
  Error,
  document::SeedData,
  facility::{Facility, FacilityId, NewFacility},
  hit::{Hit, HitId, NewHit},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Lets callers tell the error categories apart without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The referenced facility or hit does not exist.
  fn is_not_found(&self) -> bool;

  /// The input failed validation.
  fn is_invalid(&self) -> bool;

  /// The backing store cannot be reached at all.
  fn is_unavailable(&self) -> bool;
}

impl StoreError for Error {
  fn is_not_found(&self) -> bool {
    matches!(self, Self::FacilityNotFound(_) | Self::HitNotFound(_))
  }

  fn is_invalid(&self) -> bool { matches!(self, Self::Validation(_)) }

  fn is_unavailable(&self) -> bool { matches!(self, Self::PersistenceUnavailable(_)) }
}

/// Outcome of [`FacilityStore::import_documents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub facilities: usize,
  pub hits:       usize,
  /// Documents that could not be decoded or whose facility is missing.
  pub skipped:    usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Oilwatch store backend.
///
/// Every write is whole-document and last-writer-wins. Implementations must
/// re-derive the owning facility's `hit` flag within the same transaction as
/// each hit write, and on every facility write, so the flag can never be
/// observed out of step with the hit set. Identifiers are allocated by the
/// store from a monotonic sequence.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FacilityStore: Send + Sync {
  type Error: StoreError;

  // ── Facilities ────────────────────────────────────────────────────────

  /// All facilities, drafts included, in id order.
  fn list_facilities(
    &self,
  ) -> impl Future<Output = Result<Vec<Facility>, Self::Error>> + Send + '_;

  /// Retrieve a facility by id. Returns `None` if not found.
  fn get_facility(
    &self,
    id: FacilityId,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + '_;

  /// Validate and persist a new facility under a freshly allocated id.
  fn create_facility(
    &self,
    input: NewFacility,
  ) -> impl Future<Output = Result<Facility, Self::Error>> + Send + '_;

  /// Insert or replace a facility. The supplied `hit` value is ignored and
  /// re-derived from the stored hits. Returns the facility as written.
  fn put_facility(
    &self,
    facility: Facility,
  ) -> impl Future<Output = Result<Facility, Self::Error>> + Send + '_;

  /// Delete a facility and every hit that references it, atomically.
  /// Returns `false` if the facility did not exist.
  fn delete_facility(
    &self,
    id: FacilityId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite the stored `hit` flag without touching hits. The next hit
  /// mutation for this facility re-derives it again.
  fn set_hit_flag(
    &self,
    id: FacilityId,
    hit: bool,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + '_;

  // ── Hits ──────────────────────────────────────────────────────────────

  /// Hits for one facility, newest first.
  fn list_hits_by_facility(
    &self,
    facility_id: FacilityId,
  ) -> impl Future<Output = Result<Vec<Hit>, Self::Error>> + Send + '_;

  /// Every hit, newest first.
  fn list_all_hits(&self) -> impl Future<Output = Result<Vec<Hit>, Self::Error>> + Send + '_;

  fn get_hit(
    &self,
    id: HitId,
  ) -> impl Future<Output = Result<Option<Hit>, Self::Error>> + Send + '_;

  /// Validate and persist a new hit. Fails with a not-found error if the
  /// facility does not exist.
  fn create_hit(
    &self,
    input: NewHit,
  ) -> impl Future<Output = Result<Hit, Self::Error>> + Send + '_;

  /// Insert or replace a hit. If the hit moved between facilities, both
  /// facilities' flags are re-derived.
  fn put_hit(&self, hit: Hit) -> impl Future<Output = Result<Hit, Self::Error>> + Send + '_;

  /// Delete a hit and return it. Returns `None` if it did not exist.
  fn delete_hit(
    &self,
    id: HitId,
  ) -> impl Future<Output = Result<Option<Hit>, Self::Error>> + Send + '_;

  // ── Bulk ──────────────────────────────────────────────────────────────

  /// Load raw documents of any historical shape, keeping their ids.
  /// Undecodable documents and hits without a facility are skipped.
  fn import_documents(
    &self,
    seed: SeedData,
  ) -> impl Future<Output = Result<ImportSummary, Self::Error>> + Send + '_;
}
