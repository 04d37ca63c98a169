//! Colored point clouds and whole-frame back-projection

use nalgebra::Vector3;
use ndarray::{ArrayView2, ArrayView3};
use rayon::prelude::*;

use crate::camera::{CameraIntrinsics, CameraModel};
use crate::coordinate::RigidTransform;
use crate::error::{MkfError, Result};

/// 8-bit RGB color of one point
pub type Rgb = [u8; 3];

/// Unordered set of camera- or world-space points with optional colors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Vector3<f64>>,
    colors: Option<Vec<Rgb>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<Vector3<f64>>) -> Self {
        Self {
            points,
            colors: None,
        }
    }

    /// Create a colored cloud; `colors` must pair one-to-one with `points`
    pub fn from_colored(points: Vec<Vector3<f64>>, colors: Vec<Rgb>) -> Result<Self> {
        if points.len() != colors.len() {
            return Err(MkfError::InvalidInput(format!(
                "{} points but {} colors",
                points.len(),
                colors.len()
            )));
        }
        Ok(Self {
            points,
            colors: Some(colors),
        })
    }

    /// Back-project every pixel with a non-zero depth sample.
    ///
    /// `color` is `(height, width, 3)`, `depth` is `(height, width)`; both must
    /// match the intrinsics. Points keep row-major pixel order.
    pub fn from_rgbd(
        color: &ArrayView3<'_, u8>,
        depth: &ArrayView2<'_, u16>,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Self> {
        let (rows, cols) = depth.dim();
        let (c_rows, c_cols, channels) = color.dim();
        if (c_rows, c_cols) != (rows, cols) || channels < 3 {
            return Err(MkfError::InvalidInput(format!(
                "color image {}x{}x{} does not pair with depth {}x{}",
                c_rows, c_cols, channels, rows, cols
            )));
        }

        let samples: Vec<(Vector3<f64>, Rgb)> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|v| {
                (0..cols).filter_map(move |u| {
                    let raw = depth[[v, u]];
                    if raw == 0 {
                        return None;
                    }
                    let z = intrinsics.metric_depth(raw);
                    let point = intrinsics.back_project((u as f64, v as f64), z);
                    let rgb = [color[[v, u, 0]], color[[v, u, 1]], color[[v, u, 2]]];
                    Some((point, rgb))
                })
            })
            .collect();

        let (points, colors) = samples.into_iter().unzip();
        Ok(Self {
            points,
            colors: Some(colors),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn colors(&self) -> Option<&[Rgb]> {
        self.colors.as_deref()
    }

    /// Keep the points listed in `indices`, or every other point if `invert`.
    ///
    /// Out-of-range indices are ignored; duplicates select a point once.
    pub fn select_by_index(&self, indices: &[usize], invert: bool) -> PointCloud {
        let mut mask = vec![invert; self.points.len()];
        for &i in indices {
            if let Some(flag) = mask.get_mut(i) {
                *flag = !invert;
            }
        }

        let points = self
            .points
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| *p)
            .collect();
        let colors = self.colors.as_ref().map(|colors| {
            colors
                .iter()
                .zip(&mask)
                .filter(|(_, keep)| **keep)
                .map(|(c, _)| *c)
                .collect()
        });
        PointCloud { points, colors }
    }

    /// Apply `transform` to every point in place
    pub fn transform(&mut self, transform: &RigidTransform) {
        let rotation = transform.rotation();
        let translation = transform.translation();
        self.points
            .par_iter_mut()
            .for_each(|p| *p = rotation * *p + translation);
    }

    /// Append `other`.
    ///
    /// Colors survive only when both sides carry them (an empty cloud adopts
    /// the other side's colors).
    pub fn union(&mut self, other: PointCloud) {
        if other.points.is_empty() {
            return;
        }
        if self.points.is_empty() {
            *self = other;
            return;
        }
        self.colors = match (self.colors.take(), other.colors) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend(theirs);
                Some(mine)
            }
            _ => None,
        };
        self.points.extend(other.points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector6;
    use ndarray::{Array2, Array3};

    fn cloud_of(n: usize) -> PointCloud {
        let points = (0..n).map(|i| Vector3::new(i as f64, 0.0, 1.0)).collect();
        let colors = (0..n).map(|i| [i as u8, 0, 0]).collect();
        PointCloud::from_colored(points, colors).unwrap()
    }

    #[test]
    fn test_from_colored_length_mismatch() {
        let result = PointCloud::from_colored(vec![Vector3::zeros()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_rgbd_skips_missing_depth() {
        let intrinsics = CameraIntrinsics::new(4, 3, 2.0, 2.0, 1.5, 1.0, 0.01);
        let mut depth = Array2::<u16>::zeros((3, 4));
        let mut color = Array3::<u8>::zeros((3, 4, 3));
        depth[[0, 0]] = 100;
        depth[[2, 3]] = 200;
        color[[2, 3, 1]] = 255;

        let cloud = PointCloud::from_rgbd(&color.view(), &depth.view(), &intrinsics).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_relative_eq!(cloud.points()[0], Vector3::new(-0.75, -0.5, 1.0), epsilon = 1e-12);
        assert_relative_eq!(cloud.points()[1], Vector3::new(1.5, 1.0, 2.0), epsilon = 1e-12);
        assert_eq!(cloud.colors().unwrap()[1], [0, 255, 0]);
    }

    #[test]
    fn test_from_rgbd_shape_mismatch() {
        let intrinsics = CameraIntrinsics::new(4, 3, 2.0, 2.0, 1.5, 1.0, 0.01);
        let depth = Array2::<u16>::zeros((3, 4));
        let color = Array3::<u8>::zeros((4, 3, 3));
        assert!(PointCloud::from_rgbd(&color.view(), &depth.view(), &intrinsics).is_err());
    }

    #[test]
    fn test_select_by_index_invert() {
        let cloud = cloud_of(5);
        let kept = cloud.select_by_index(&[1, 3, 3, 99], false);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.colors().unwrap(), &[[1, 0, 0], [3, 0, 0]]);

        let removed = cloud.select_by_index(&[1, 3], true);
        assert_eq!(removed.len(), 3);
        assert_eq!(removed.points()[1].x, 2.0);
    }

    #[test]
    fn test_transform() {
        let mut cloud = cloud_of(3);
        let t = RigidTransform::from_params(&Vector6::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0));
        cloud.transform(&t);
        assert_relative_eq!(cloud.points()[2], Vector3::new(2.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_union_keeps_colors() {
        let mut acc = PointCloud::new();
        acc.union(cloud_of(2));
        acc.union(cloud_of(3));
        assert_eq!(acc.len(), 5);
        assert_eq!(acc.colors().map(|c| c.len()), Some(5));

        acc.union(PointCloud::new());
        assert_eq!(acc.len(), 5);
        assert_eq!(acc.colors().map(|c| c.len()), Some(5));

        acc.union(PointCloud::from_points(vec![Vector3::zeros()]));
        assert_eq!(acc.len(), 6);
        assert!(acc.colors().is_none());
    }
}
