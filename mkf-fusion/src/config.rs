//! Tunable parameters of a reconstruction run

use mkf_core::RansacOptions;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub plane: PlaneSuppressionConfig,
    pub registration: RegistrationConfig,
}

impl ReconstructionConfig {
    pub fn validate(&self) -> Result<()> {
        self.plane.validate()?;
        self.registration.validate()
    }
}

/// Removal of the dominant (support surface) plane from every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneSuppressionConfig {
    pub enabled: bool,
    /// Inlier distance to the plane, in point-cloud units
    pub distance_threshold: f64,
    pub max_iterations: usize,
    /// Early-exit confidence of the consensus search; `0` runs every iteration
    pub confidence: f64,
    pub seed: u64,
}

impl Default for PlaneSuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_threshold: 0.01,
            max_iterations: 1000,
            confidence: 0.999,
            seed: 0x5eed_f00d,
        }
    }
}

impl PlaneSuppressionConfig {
    pub fn ransac_options(&self) -> RansacOptions {
        RansacOptions {
            max_iters: self.max_iterations,
            thresh: self.distance_threshold,
            min_inliers: 3,
            confidence: self.confidence,
            seed: self.seed,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.distance_threshold.is_finite() && self.distance_threshold > 0.0) {
            return Err(FusionError::Config(format!(
                "plane.distance_threshold must be positive, got {}",
                self.distance_threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(FusionError::Config(
                "plane.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.confidence) {
            return Err(FusionError::Config(format!(
                "plane.confidence must be in [0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Marker-to-reference alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// BFGS stops once the gradient norm drops below this
    pub gradient_tolerance: f64,
    pub max_iterations: u64,
    /// `eps` in the per-marker distance `sqrt(d^2 + eps^2)`
    pub distance_smoothing: f64,
    /// Reject fits whose mean marker distance stays above this; `None` accepts any
    pub max_mean_distance: Option<f64>,
    /// At least 3; fewer cannot pin down a rigid transform
    pub min_correspondences: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            gradient_tolerance: 1e-3,
            max_iterations: 200,
            distance_smoothing: 1e-4,
            max_mean_distance: Some(0.05),
            min_correspondences: 3,
        }
    }
}

impl RegistrationConfig {
    fn validate(&self) -> Result<()> {
        if !(self.gradient_tolerance.is_finite() && self.gradient_tolerance > 0.0) {
            return Err(FusionError::Config(format!(
                "registration.gradient_tolerance must be positive, got {}",
                self.gradient_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(FusionError::Config(
                "registration.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.distance_smoothing.is_finite() && self.distance_smoothing > 0.0) {
            return Err(FusionError::Config(format!(
                "registration.distance_smoothing must be positive, got {}",
                self.distance_smoothing
            )));
        }
        if self.min_correspondences < 3 {
            return Err(FusionError::Config(format!(
                "registration.min_correspondences must be at least 3, got {}",
                self.min_correspondences
            )));
        }
        Ok(())
    }
}
