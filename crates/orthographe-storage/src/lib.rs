//! SQLite persistence for learner progress and dictation catalogs.
//!
//! Progress is a single JSON record in a key-value table. The
//! [`ProgressStore`] keeps it in memory, overlays the built-in seed
//! catalogs, and writes the whole record back after every change.

pub mod db;
pub mod kv;
pub mod migrations;
pub mod progress;
pub mod seed;

pub use db::Database;
pub use kv::KeyValueRepository;
pub use progress::{ProgressStore, PROGRESS_KEY};
pub use seed::seed_catalogs;
