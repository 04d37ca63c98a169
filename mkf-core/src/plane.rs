//! Plane model and robust plane segmentation

use nalgebra::{Matrix3, Unit, Vector3};

use crate::error::PlaneFitError;
use crate::ransac::{ransac, Estimator, RansacOptions};

/// Plane `normal . p + offset = 0` with unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Unit<Vector3<f64>>,
    pub offset: f64,
}

impl Plane {
    /// Plane through three points, `None` if they are (nearly) collinear
    pub fn through(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let scale = (b - a).norm() * (c - a).norm();
        if scale <= f64::EPSILON || n.norm() <= 1e-9 * scale {
            return None;
        }
        let normal = Unit::new_normalize(n);
        Some(Self {
            normal,
            offset: -normal.dot(a),
        })
    }

    /// Total least-squares plane through `points`
    pub fn fit_least_squares<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Vector3<f64>>,
    {
        let points: Vec<&Vector3<f64>> = points.into_iter().collect();
        if points.len() < 3 {
            return None;
        }
        let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + *p) / points.len() as f64;
        let scatter = points.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = *p - centroid;
            acc + d * d.transpose()
        });
        let eigen = scatter.symmetric_eigen();
        let (smallest, _) = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let n = eigen.eigenvectors.column(smallest).into_owned();
        if n.norm() <= f64::EPSILON {
            return None;
        }
        let normal = Unit::new_normalize(n);
        Some(Self {
            normal,
            offset: -normal.dot(&centroid),
        })
    }

    /// Unsigned point-to-plane distance
    pub fn distance(&self, p: &Vector3<f64>) -> f64 {
        (self.normal.dot(p) + self.offset).abs()
    }

    /// `(a, b, c, d)` coefficients of `ax + by + cz + d = 0`
    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.offset]
    }
}

struct PlaneEstimator;

impl Estimator for PlaneEstimator {
    type Datum = Vector3<f64>;
    type Model = Plane;

    const MIN_SAMPLES: usize = 3;

    fn fit(data: &[Vector3<f64>], sample: &[usize]) -> Option<Plane> {
        Plane::through(&data[sample[0]], &data[sample[1]], &data[sample[2]])
    }

    fn residual(model: &Plane, datum: &Vector3<f64>) -> f64 {
        model.distance(datum)
    }

    fn refit(data: &[Vector3<f64>], inliers: &[usize]) -> Option<Plane> {
        Plane::fit_least_squares(inliers.iter().map(|&i| &data[i]))
    }
}

/// Dominant plane and its supporting points
#[derive(Debug, Clone)]
pub struct PlaneSegmentation {
    pub plane: Plane,
    /// Indices into the input points, ascending
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

/// Find the plane supported by the most points within `opts.thresh`
pub fn segment_plane(
    points: &[Vector3<f64>],
    opts: &RansacOptions,
) -> Result<PlaneSegmentation, PlaneFitError> {
    if points.len() < PlaneEstimator::MIN_SAMPLES {
        return Err(PlaneFitError::TooFewPoints {
            found: points.len(),
            required: PlaneEstimator::MIN_SAMPLES,
        });
    }
    let consensus = ransac::<PlaneEstimator>(points, opts).ok_or(PlaneFitError::Degenerate {
        iterations: opts.max_iters,
    })?;
    Ok(PlaneSegmentation {
        plane: consensus.model,
        inliers: consensus.inliers,
        iterations: consensus.iters,
    })
}
