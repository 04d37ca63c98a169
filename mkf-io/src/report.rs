//! JSON summary of a reconstruction run

use std::fs;
use std::path::Path;

use mkf_fusion::{FailureReason, ReconstructionResult};
use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PlaneFitDegenerate,
    NoMarkersFound,
    Registration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub index: usize,
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEntry {
    pub index: usize,
    /// Row-major frame-to-reference transform
    pub transform: [[f64; 4]; 4],
    pub initial_guess: [[f64; 4]; 4],
    pub mean_distance: f64,
    pub iterations: u64,
    pub markers: Vec<usize>,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub frames_processed: usize,
    pub reference_frame: Option<usize>,
    pub total_points: usize,
    pub failed_frames: Vec<usize>,
    pub failures: Vec<FailureEntry>,
    pub fused: Vec<FusedEntry>,
}

impl RunReport {
    pub fn new(result: &ReconstructionResult, frames_processed: usize) -> Self {
        let failures = result
            .failures
            .iter()
            .map(|f| FailureEntry {
                index: f.index,
                kind: match f.reason {
                    FailureReason::PlaneFitDegenerate(_) => FailureKind::PlaneFitDegenerate,
                    FailureReason::NoMarkersFound => FailureKind::NoMarkersFound,
                    FailureReason::Registration(_) => FailureKind::Registration,
                },
                detail: f.reason.to_string(),
            })
            .collect();
        let fused = result
            .fused
            .iter()
            .map(|f| FusedEntry {
                index: f.index,
                transform: f.transform.to_rows(),
                initial_guess: f.initial_guess.to_rows(),
                mean_distance: f.mean_distance,
                iterations: f.iterations,
                markers: f.correspondences.clone(),
                points: f.points,
            })
            .collect();

        Self {
            frames_processed,
            reference_frame: result.reference_index,
            total_points: result.cloud.len(),
            failed_frames: result.failed_frame_indices(),
            failures,
            fused,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| IoError::json(path, e))?;
        fs::write(path, json).map_err(|e| IoError::file(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkf_core::{PointCloud, RigidTransform};
    use mkf_fusion::{FrameFailure, FusedFrame, RegistrationError};
    use nalgebra::Vector3;

    fn result() -> ReconstructionResult {
        ReconstructionResult {
            cloud: PointCloud::from_points(vec![Vector3::zeros(); 3]),
            reference_index: Some(0),
            reference_markers: None,
            failures: vec![
                FrameFailure {
                    index: 2,
                    reason: FailureReason::NoMarkersFound,
                },
                FrameFailure {
                    index: 4,
                    reason: FailureReason::Registration(
                        RegistrationError::InsufficientCorrespondences {
                            found: 2,
                            required: 3,
                        },
                    ),
                },
            ],
            fused: vec![FusedFrame {
                index: 1,
                initial_guess: RigidTransform::identity(),
                transform: RigidTransform::identity(),
                mean_distance: 0.001,
                iterations: 7,
                correspondences: vec![0, 3, 5],
                points: 2,
            }],
        }
    }

    #[test]
    fn test_report_contents() {
        let report = RunReport::new(&result(), 5);
        assert_eq!(report.failed_frames, vec![2, 4]);
        assert_eq!(report.failures[1].kind, FailureKind::Registration);
        assert_eq!(report.fused[0].transform[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(report.total_points, 3);
    }

    #[test]
    fn test_written_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunReport::new(&result(), 5).write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["failed_frames"], serde_json::json!([2, 4]));
        assert_eq!(value["failures"][0]["kind"], "no_markers_found");
        assert_eq!(value["reference_frame"], 0);
    }
}
