//! JSON REST API for Oilwatch.
//!
//! Exposes an axum [`Router`] backed by any [`oilwatch_core::store::FacilityStore`].
//! There is no authentication; put the server behind something that has it.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", oilwatch_api::api_router(state))
//! ```

pub mod error;
pub mod facilities;
pub mod hits;
pub mod map;
pub mod rings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use oilwatch_core::{geometry::RangeRingConfig, store::FacilityStore};

pub use error::ApiError;

/// Handler state: the store plus the ring settings from configuration.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub rings: Arc<RangeRingConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, rings: RangeRingConfig) -> Self {
    Self { store: Arc::new(store), rings: Arc::new(rings) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), rings: Arc::clone(&self.rings) }
  }
}

/// Every API route, with `state` already applied so the result nests under
/// any parent router.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: FacilityStore + 'static,
{
  Router::new()
    // Facilities
    .route("/facilities", get(facilities::list::<S>).post(facilities::create::<S>))
    .route(
      "/facilities/{id}",
      get(facilities::get_one::<S>)
        .put(facilities::update::<S>)
        .delete(facilities::delete_one::<S>),
    )
    .route("/facilities/{id}/hit", patch(facilities::toggle_hit::<S>))
    // Hits
    .route(
      "/facilities/{id}/hits",
      get(hits::list_for_facility::<S>).post(hits::create::<S>),
    )
    .route(
      "/facilities/{id}/hits/{hit_id}",
      put(hits::update::<S>).delete(hits::delete_one::<S>),
    )
    .route("/hits", get(hits::list_all::<S>))
    // Public map
    .route("/map", get(map::handler::<S>))
    .route("/range-rings", post(rings::handler::<S>))
    .with_state(state)
}
