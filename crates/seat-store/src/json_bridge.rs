use std::fs;
use std::path::Path;

use seat_core::{export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Replace the catalog with the contents of a JSON export file.
    pub fn import_json_file(&self, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_json_str(&json)
    }

    /// Replace the catalog with a JSON string. Returns the seat count.
    pub fn import_json_str(&self, json: &str) -> Result<usize> {
        let catalog = import_json(json)?;
        self.replace_catalog(&catalog)?;
        tracing::info!(
            seats = catalog.seats.len(),
            bookings = catalog.bookings.len(),
            "imported catalog"
        );
        Ok(catalog.seats.len())
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn export_json_string(&self) -> Result<String> {
        let catalog = self.load_catalog()?;
        Ok(export_json(&catalog)?)
    }
}
