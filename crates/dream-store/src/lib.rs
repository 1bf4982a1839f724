//! SQLite persistence, data directory and config loading, and JSON export
//! for dream-core.

pub mod config;
pub mod error;
pub mod export;
pub mod schema;
pub mod store;

pub use config::{DataDir, parse_config};
pub use error::{Result, StoreError};
pub use export::{EXPORT_VERSION, ProfileExport, export_json, export_profile};
pub use store::Store;
