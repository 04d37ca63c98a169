use std::fs;
use std::path::Path;

use mkf_core::CameraIntrinsics;

use crate::error::{IoError, Result};

/// Load and validate camera intrinsics from a JSON file
pub fn load_intrinsics(path: &Path) -> Result<CameraIntrinsics> {
    let raw = fs::read_to_string(path).map_err(|e| IoError::file(path, e))?;
    let intrinsics: CameraIntrinsics =
        serde_json::from_str(&raw).map_err(|e| IoError::json(path, e))?;
    intrinsics.validate()?;
    Ok(intrinsics)
}
