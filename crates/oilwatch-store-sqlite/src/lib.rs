//! SQLite backend for the Oilwatch store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Facilities and hits are stored as JSON
//! documents; [`migrations`] brings older document shapes up to date.

mod encode;
mod store;

pub mod error;
pub mod migrations;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
