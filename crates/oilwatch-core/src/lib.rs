//! Domain model for the Oilwatch facility tracker: facilities, hits, the
//! values derived from them, map filtering, range-ring geometry and the
//! [`store::FacilityStore`] trait.
//!
//! No HTTP or SQL in here. The in-memory store lives alongside the trait so
//! every layer above can run without a database.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod derived;
pub mod document;
pub mod error;
pub mod facility;
pub mod filter;
pub mod geometry;
pub mod hit;
pub mod memory;
pub mod store;

pub use error::{Error, Result};
