use super::CameraModel;
use crate::error::{MkfError, ProjectionError, Result};
use nalgebra::Vector3;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics of an RGBD sensor, including the raw-depth scale.
///
/// `depth_scale` converts a raw depth sample to metric depth:
/// `z = raw * depth_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    width: usize,
    height: usize,
    #[serde(alias = "fx")]
    focal_x: f64,
    #[serde(alias = "fy")]
    focal_y: f64,
    #[serde(alias = "ppx", alias = "cx")]
    principal_x: f64,
    #[serde(alias = "ppy", alias = "cy")]
    principal_y: f64,
    depth_scale: f64,
}

impl CameraIntrinsics {
    /// Create intrinsics from pixel-unit focal lengths and principal point
    pub fn new(
        width: usize,
        height: usize,
        focal_x: f64,
        focal_y: f64,
        principal_x: f64,
        principal_y: f64,
        depth_scale: f64,
    ) -> Self {
        Self {
            width,
            height,
            focal_x,
            focal_y,
            principal_x,
            principal_y,
            depth_scale,
        }
    }

    /// Reject intrinsics that cannot back-project anything meaningful
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MkfError::InvalidInput(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;
        if !finite_positive(self.focal_x) || !finite_positive(self.focal_y) {
            return Err(MkfError::InvalidInput(format!(
                "focal lengths must be positive, got ({}, {})",
                self.focal_x, self.focal_y
            )));
        }
        if !finite_positive(self.depth_scale) {
            return Err(MkfError::InvalidInput(format!(
                "depth_scale must be positive, got {}",
                self.depth_scale
            )));
        }
        Ok(())
    }

    /// Get focal lengths
    pub fn focal_length(&self) -> (f64, f64) {
        (self.focal_x, self.focal_y)
    }

    /// Get principal point
    pub fn principal_point(&self) -> (f64, f64) {
        (self.principal_x, self.principal_y)
    }

    pub fn depth_scale(&self) -> f64 {
        self.depth_scale
    }

    /// Expected `(rows, cols)` of every depth grid captured with this camera
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Fail unless a depth grid of `shape` matches these intrinsics
    pub fn check_grid(&self, index: usize, shape: (usize, usize)) -> Result<()> {
        if shape != self.grid_shape() {
            return Err(MkfError::DimensionMismatch {
                index,
                expected: self.grid_shape(),
                found: shape,
            });
        }
        Ok(())
    }

    /// Back-project the integer pixel `(u, v)` using the raw sample `depth[v, u]`
    pub fn back_project_pixel(
        &self,
        u: i64,
        v: i64,
        depth: &ArrayView2<'_, u16>,
    ) -> Result<Vector3<f64>> {
        let (rows, cols) = depth.dim();
        if u < 0 || v < 0 || u as usize >= cols || v as usize >= rows {
            return Err(ProjectionError::OutOfBounds {
                u,
                v,
                width: cols,
                height: rows,
            }
            .into());
        }
        let raw = depth[[v as usize, u as usize]];
        Ok(self.back_project((u as f64, v as f64), self.metric_depth(raw)))
    }

    /// Convert a raw depth sample to metric depth
    pub fn metric_depth(&self, raw: u16) -> f64 {
        raw as f64 * self.depth_scale
    }

    /// Project a camera-space point to `(u, v, raw_depth)`, the inverse of
    /// [`CameraIntrinsics::back_project_pixel`] before quantization.
    pub fn project_with_depth(&self, point_camera: &Vector3<f64>) -> Option<(f64, f64, f64)> {
        let (u, v) = self.project(point_camera)?;
        Some((u, v, point_camera.z / self.depth_scale))
    }
}

impl CameraModel for CameraIntrinsics {
    fn project(&self, point_camera: &Vector3<f64>) -> Option<(f64, f64)> {
        if point_camera.z <= 0.0 {
            return None;
        }

        let u = self.focal_x * point_camera.x / point_camera.z + self.principal_x;
        let v = self.focal_y * point_camera.y / point_camera.z + self.principal_y;

        Some((u, v))
    }

    fn back_project(&self, pixel: (f64, f64), z: f64) -> Vector3<f64> {
        let x = (pixel.0 - self.principal_x) * z / self.focal_x;
        let y = (pixel.1 - self.principal_y) * z / self.focal_y;
        Vector3::new(x, y, z)
    }

    fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn primesense() -> CameraIntrinsics {
        CameraIntrinsics::new(640, 480, 525.0, 525.0, 319.5, 239.5, 0.001)
    }

    #[test]
    fn test_projection_center() {
        let camera = primesense();
        let pixel = camera.project(&Vector3::new(0.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(pixel.0, 319.5, epsilon = 1e-9);
        assert_relative_eq!(pixel.1, 239.5, epsilon = 1e-9);
    }

    #[test]
    fn test_behind_camera() {
        let camera = primesense();
        assert!(camera.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
        assert!(camera.project(&Vector3::new(0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_back_project_formula() {
        let camera = CameraIntrinsics::new(640, 480, 500.0, 400.0, 320.0, 240.0, 0.001);
        let mut depth = Array2::<u16>::zeros((480, 640));
        depth[[140, 420]] = 2000;

        let p = camera.back_project_pixel(420, 140, &depth.view()).unwrap();
        assert_relative_eq!(p.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.x, (420.0 - 320.0) * 2.0 / 500.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, (140.0 - 240.0) * 2.0 / 400.0, epsilon = 1e-12);
    }

    #[test]
    fn test_back_project_roundtrip() {
        let camera = primesense();
        let mut depth = Array2::<u16>::zeros((480, 640));
        for &(u, v, d) in &[(0, 0, 500u16), (639, 479, 4000), (100, 300, 1234), (320, 240, 1)] {
            depth[[v, u]] = d;
            let p = camera
                .back_project_pixel(u as i64, v as i64, &depth.view())
                .unwrap();
            let (pu, pv, pd) = camera.project_with_depth(&p).unwrap();
            assert_relative_eq!(pu, u as f64, epsilon = 1e-9);
            assert_relative_eq!(pv, v as f64, epsilon = 1e-9);
            assert_relative_eq!(pd, d as f64, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_back_project_out_of_bounds() {
        let camera = primesense();
        let depth = Array2::<u16>::zeros((480, 640));
        for &(u, v) in &[(-1, 0), (0, -1), (640, 0), (0, 480)] {
            let err = camera.back_project_pixel(u, v, &depth.view()).unwrap_err();
            assert!(matches!(
                err,
                MkfError::Projection(ProjectionError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_check_grid() {
        let camera = primesense();
        assert!(camera.check_grid(0, (480, 640)).is_ok());
        let err = camera.check_grid(4, (640, 480)).unwrap_err();
        assert!(matches!(err, MkfError::DimensionMismatch { index: 4, .. }));
    }

    #[test]
    fn test_validate() {
        assert!(primesense().validate().is_ok());
        let bad = CameraIntrinsics::new(640, 480, 0.0, 525.0, 319.5, 239.5, 0.001);
        assert!(bad.validate().is_err());
        let bad = CameraIntrinsics::new(640, 480, 525.0, 525.0, 319.5, 239.5, -1.0);
        assert!(bad.validate().is_err());
        let bad = CameraIntrinsics::new(0, 480, 525.0, 525.0, 319.5, 239.5, 0.001);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_image_size() {
        let camera = primesense();
        assert_eq!(camera.image_size(), (640, 480));
        assert_eq!(camera.grid_shape(), (480, 640));
    }
}
