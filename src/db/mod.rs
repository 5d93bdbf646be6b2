//! Database module: catalog aggregates and SQL repositories.
//!
//! - `model`: aggregates and view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! The repository API is re-exported at `union_fetch::db`.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{FetchBundle, FetchSummary};
