//! Rigid alignment of marker sets.
//!
//! The transform is parameterized as `(tx, ty, tz, rx, ry, rz)` and found by
//! BFGS on the mean marker distance. Each distance is evaluated as
//! `sqrt(d^2 + eps^2)` so the objective stays differentiable at a perfect
//! fit and the analytic gradient is exact.

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, Gradient, State, TerminationReason,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::BFGS;
use log::debug;
use mkf_core::coordinate::{euler_xyz_partials, euler_xyz_to_rotation};
use mkf_core::{MarkerSet, Plane, RigidTransform};
use nalgebra::{Vector3, Vector6};

use crate::config::RegistrationConfig;
use crate::error::RegistrationError;

/// Successful alignment of one marker set onto another
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub transform: RigidTransform,
    /// Unsmoothed mean distance between transformed source and target markers
    pub mean_distance: f64,
    /// Optimizer iterations; `0` when the initial guess was already stationary
    pub iterations: u64,
    /// Marker identities used for the fit, ascending
    pub correspondences: Vec<usize>,
}

/// Mean smoothed distance between `R * source + t` and `target`
#[derive(Clone)]
struct AlignmentCost {
    pairs: Vec<(Vector3<f64>, Vector3<f64>)>,
    eps: f64,
}

fn split_params(p: &[f64]) -> (Vector3<f64>, Vector3<f64>) {
    (Vector3::new(p[0], p[1], p[2]), Vector3::new(p[3], p[4], p[5]))
}

impl AlignmentCost {
    fn residuals<'a>(&'a self, p: &[f64]) -> impl Iterator<Item = Vector3<f64>> + 'a {
        let (t, angles) = split_params(p);
        let r = euler_xyz_to_rotation(&angles);
        self.pairs.iter().map(move |(s, q)| r * s + t - q)
    }

    fn mean_distance(&self, p: &[f64]) -> f64 {
        let total: f64 = self.residuals(p).map(|r| r.norm()).sum();
        total / self.pairs.len() as f64
    }
}

impl CostFunction for AlignmentCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let eps2 = self.eps * self.eps;
        let total: f64 = self
            .residuals(p)
            .map(|r| (r.norm_squared() + eps2).sqrt())
            .sum();
        Ok(total / self.pairs.len() as f64)
    }
}

impl Gradient for AlignmentCost {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        let (t, angles) = split_params(p);
        let r = euler_xyz_to_rotation(&angles);
        let partials = euler_xyz_partials(&angles);
        let eps2 = self.eps * self.eps;

        let mut grad = Vector6::<f64>::zeros();
        for (s, q) in &self.pairs {
            let res = r * s + t - q;
            let d = (res.norm_squared() + eps2).sqrt();
            let unit = res / d;
            grad[0] += unit.x;
            grad[1] += unit.y;
            grad[2] += unit.z;
            for (k, dr) in partials.iter().enumerate() {
                grad[3 + k] += unit.dot(&(dr * s));
            }
        }
        grad /= self.pairs.len() as f64;
        Ok(grad.iter().copied().collect())
    }
}

/// At least one triple of the points spans a plane
fn spans_plane(points: &[Vector3<f64>]) -> bool {
    let n = points.len();
    (0..n).any(|i| {
        (i + 1..n).any(|j| {
            (j + 1..n).any(|k| Plane::through(&points[i], &points[j], &points[k]).is_some())
        })
    })
}

/// BFGS-based marker-set aligner
#[derive(Debug, Clone)]
pub struct RegistrationSolver {
    config: RegistrationConfig,
}

impl Default for RegistrationSolver {
    fn default() -> Self {
        Self::new(RegistrationConfig::default())
    }
}

impl RegistrationSolver {
    pub fn new(config: RegistrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Fewest shared markers a solve accepts
    pub fn required_correspondences(&self) -> usize {
        self.config.min_correspondences.max(3)
    }

    /// Find the rigid transform mapping `source` markers onto `target`
    /// markers, starting from `initial`.
    ///
    /// Only identities observed in both sets take part. The result is
    /// rejected when fewer than `min_correspondences` (or only collinear)
    /// markers are shared, when the iteration budget runs out, or when the
    /// final mean distance exceeds `max_mean_distance`.
    pub fn solve(
        &self,
        source: &MarkerSet,
        target: &MarkerSet,
        initial: &RigidTransform,
    ) -> Result<Registration, RegistrationError> {
        let shared = source.correspondences(target);
        let required = self.required_correspondences();
        let source_points: Vec<Vector3<f64>> = shared.iter().map(|(_, s, _)| *s).collect();
        if shared.len() < required || !spans_plane(&source_points) {
            return Err(RegistrationError::InsufficientCorrespondences {
                found: shared.len(),
                required,
            });
        }

        let ids: Vec<usize> = shared.iter().map(|(id, _, _)| *id).collect();
        let cost = AlignmentCost {
            pairs: shared.into_iter().map(|(_, s, q)| (s, q)).collect(),
            eps: self.config.distance_smoothing,
        };
        let init: Vec<f64> = initial.to_params().iter().copied().collect();

        let start_grad = cost
            .gradient(&init)
            .map_err(|e| RegistrationError::Optimizer(e.to_string()))?;
        let (params, iterations) = if norm(&start_grad) < self.config.gradient_tolerance {
            debug!("initial guess already stationary, skipping BFGS");
            (init, 0)
        } else {
            self.minimize(&cost, init)?
        };

        let mean_distance = cost.mean_distance(&params);
        if let Some(limit) = self.config.max_mean_distance
            && (mean_distance.is_nan() || mean_distance > limit)
        {
            return Err(RegistrationError::NotConverged {
                iterations,
                mean_distance,
            });
        }

        let transform = RigidTransform::try_from_params(&Vector6::from_column_slice(&params))
            .map_err(|e| RegistrationError::Optimizer(e.to_string()))?;
        Ok(Registration {
            transform,
            mean_distance,
            iterations,
            correspondences: ids,
        })
    }

    fn minimize(
        &self,
        cost: &AlignmentCost,
        init: Vec<f64>,
    ) -> Result<(Vec<f64>, u64), RegistrationError> {
        let optimizer_err = |e: ArgminError| RegistrationError::Optimizer(e.to_string());

        let linesearch: MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64> =
            MoreThuenteLineSearch::new();
        let solver = BFGS::new(linesearch)
            .with_tolerance_grad(self.config.gradient_tolerance)
            .map_err(optimizer_err)?;
        let inv_hessian: Vec<Vec<f64>> = (0..6)
            .map(|i| (0..6).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        let max_iters = self.config.max_iterations;

        let res = Executor::new(cost.clone(), solver)
            .configure(|state| state.param(init).inv_hessian(inv_hessian).max_iters(max_iters))
            .run()
            .map_err(optimizer_err)?;

        let state = res.state();
        let iterations = state.get_iter();
        let params = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| RegistrationError::Optimizer("no parameters returned".to_string()))?;
        debug!(
            "BFGS finished after {} iterations: {:?} (cost {:.3e})",
            iterations,
            state.get_termination_status(),
            state.get_best_cost()
        );

        if matches!(
            state.get_termination_reason(),
            Some(TerminationReason::MaxItersReached)
        ) {
            return Err(RegistrationError::NotConverged {
                iterations,
                mean_distance: cost.mean_distance(&params),
            });
        }
        Ok((params, iterations))
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
