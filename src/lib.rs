pub mod audit;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod partition;
pub mod placeholder;
pub mod runner;
pub mod store;

pub use compose::ScriptComposer;
pub use error::ScriptError;
pub use store::{FetchStore, SqliteStore};
