use std::path::PathBuf;

use crate::config::Settings;
use crate::error::StoreError;

pub fn database_file_path(settings: &Settings) -> Result<PathBuf, StoreError> {
    if let Some(path) = &settings.database_path {
        return Ok(path.clone());
    }
    let base = dirs::data_dir()
        .ok_or_else(|| StoreError::NotFound("unable to resolve data directory".to_string()))?;
    Ok(base.join("podlingo").join("podlingo.db"))
}
