use std::fs;
use std::path::Path;

use mkf_fusion::ReconstructionConfig;

use crate::error::{IoError, Result};

/// Load a reconstruction config from JSON; omitted fields keep their defaults
pub fn load_config(path: &Path) -> Result<ReconstructionConfig> {
    let raw = fs::read_to_string(path).map_err(|e| IoError::file(path, e))?;
    serde_json::from_str(&raw).map_err(|e| IoError::json(path, e))
}
