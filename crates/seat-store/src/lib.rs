pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;

use std::env;
use std::path::PathBuf;

pub use error::{Result, StoreError};
pub use store::CatalogStore;

/// Default base directory for catalog and config files.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".seat-advisor")
}
