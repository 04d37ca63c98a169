//! Camera models and projections

mod pinhole;

pub use pinhole::CameraIntrinsics;

use nalgebra::Vector3;

/// Mapping between camera space and the pixel grid
pub trait CameraModel {
    /// Pixel `(u, v)` of a camera-space point; `None` unless it lies in front
    /// of the camera
    fn project(&self, point_camera: &Vector3<f64>) -> Option<(f64, f64)>;

    /// Lift a pixel to the camera-space point at metric depth `z`
    fn back_project(&self, pixel: (f64, f64), z: f64) -> Vector3<f64>;

    /// `(width, height)` in pixels
    fn image_size(&self) -> (usize, usize);
}
