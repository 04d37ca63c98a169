//! Marker detections precomputed by an external 2D detector

use std::fs;
use std::path::PathBuf;

use mkf_core::{Frame, MarkerDetection, MarkerDetector};

use crate::error::IoError;

/// Reads `<dir>/<frame index>.json`, a JSON array of
/// `{ "id": .., "corners": [[x, y]; 4] }`. A frame without a file has no
/// detections.
#[derive(Debug, Clone)]
pub struct SidecarDetections {
    dir: PathBuf,
}

impl SidecarDetections {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{index}.json"))
    }
}

impl MarkerDetector for SidecarDetections {
    fn detect(&self, frame: &Frame) -> mkf_core::Result<Vec<MarkerDetection>> {
        let path = self.path(frame.index);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).map_err(|e| IoError::file(&path, e))?;
        let detections = serde_json::from_str(&raw).map_err(|e| IoError::json(&path, e))?;
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkf_core::MkfError;
    use ndarray::{Array2, Array3};

    fn frame(index: usize) -> Frame {
        Frame::new(index, Array3::zeros((2, 2, 3)), Array2::zeros((2, 2)))
    }

    #[test]
    fn test_reads_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("3.json"),
            r#"[{ "id": 5, "corners": [[1, 2], [3, 2], [3, 4], [1, 4]] }]"#,
        )
        .unwrap();
        let detector = SidecarDetections::new(dir.path());
        let found = detector.detect(&frame(3)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 5);
        assert_eq!(found[0].centroid(), (2.0, 3.0));
    }

    #[test]
    fn test_missing_sidecar_means_none() {
        let dir = tempfile::tempdir().unwrap();
        let detector = SidecarDetections::new(dir.path());
        assert!(detector.detect(&frame(0)).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_sidecar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.json"), r#"[{ "id": 1 }]"#).unwrap();
        let detector = SidecarDetections::new(dir.path());
        assert!(matches!(detector.detect(&frame(0)), Err(MkfError::Io(_))));
    }
}
