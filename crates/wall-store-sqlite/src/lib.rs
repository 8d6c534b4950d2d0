//! SQLite backend for the Wall record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Schema bootstrap and the versioned
//! migration chain live in [`migrate`].

mod encode;
mod schema;
mod store;

pub mod error;
pub mod migrate;

pub use error::{Error, Result};
pub use migrate::LATEST_VERSION;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
