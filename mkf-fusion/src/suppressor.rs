//! Support-surface removal

use log::debug;
use mkf_core::{segment_plane, PlaneFitError, PointCloud, RansacOptions};

use crate::config::PlaneSuppressionConfig;

/// Strips the dominant plane (the rig's support surface) from frame clouds
#[derive(Debug, Clone)]
pub struct PlaneSuppressor {
    enabled: bool,
    options: RansacOptions,
}

impl PlaneSuppressor {
    pub fn new(config: &PlaneSuppressionConfig) -> Self {
        Self {
            enabled: config.enabled,
            options: config.ransac_options(),
        }
    }

    /// Return `cloud` without the inliers of its best-supported plane.
    ///
    /// Fails when the cloud is too small or too degenerate to carry a plane;
    /// the frame should then be skipped rather than fused unfiltered.
    pub fn suppress(&self, cloud: PointCloud) -> Result<PointCloud, PlaneFitError> {
        if !self.enabled {
            return Ok(cloud);
        }
        let segmentation = segment_plane(cloud.points(), &self.options)?;
        debug!(
            "plane {:?}: removing {} of {} points after {} iterations",
            segmentation.plane.coefficients(),
            segmentation.inliers.len(),
            cloud.len(),
            segmentation.iterations
        );
        Ok(cloud.select_by_index(&segmentation.inliers, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    /// Table plane `z = 1.0` (tilted slightly) plus a small box resting above it
    fn table_with_object() -> (PointCloud, usize, usize) {
        let mut points = Vec::new();
        for i in 0..60 {
            for j in 0..60 {
                let x = -0.3 + i as f64 * 0.01;
                let y = -0.3 + j as f64 * 0.01;
                points.push(Vector3::new(x, y, 1.0 + 0.05 * x));
            }
        }
        let plane_count = points.len();
        for i in 0..8 {
            for j in 0..8 {
                for k in 0..4 {
                    let x = -0.04 + i as f64 * 0.01;
                    let y = -0.04 + j as f64 * 0.01;
                    let z = 1.0 + 0.05 * x - 0.04 - k as f64 * 0.02;
                    points.push(Vector3::new(x, y, z));
                }
            }
        }
        let object_count = points.len() - plane_count;
        (PointCloud::from_points(points), plane_count, object_count)
    }

    #[test]
    fn test_removes_plane_keeps_object() {
        let (cloud, plane_count, object_count) = table_with_object();
        let suppressor = PlaneSuppressor::new(&PlaneSuppressionConfig::default());
        let filtered = suppressor.suppress(cloud).unwrap();

        let plane_left = filtered
            .points()
            .iter()
            .filter(|p| (p.z - (1.0 + 0.05 * p.x)).abs() < 1e-9)
            .count();
        let object_left = filtered.len() - plane_left;

        assert!(plane_left as f64 <= 0.05 * plane_count as f64);
        assert!(object_left as f64 >= 0.95 * object_count as f64);
    }

    #[test]
    fn test_disabled_passes_through() {
        let (cloud, _, _) = table_with_object();
        let config = PlaneSuppressionConfig {
            enabled: false,
            ..Default::default()
        };
        let filtered = PlaneSuppressor::new(&config).suppress(cloud.clone()).unwrap();
        assert_eq!(filtered, cloud);
    }

    #[test]
    fn test_degenerate_cloud() {
        let suppressor = PlaneSuppressor::new(&PlaneSuppressionConfig::default());
        let cloud = PointCloud::from_points(vec![Vector3::new(0.0, 0.0, 1.0); 2]);
        assert!(matches!(
            suppressor.suppress(cloud),
            Err(PlaneFitError::TooFewPoints { .. })
        ));
        assert!(suppressor.suppress(PointCloud::new()).is_err());
    }
}
