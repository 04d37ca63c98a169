use mkf_core::MkfError;
use thiserror::Error;

/// Errors that abort a reconstruction run
#[derive(Error, Debug)]
pub enum FusionError {
    #[error(transparent)]
    Core(#[from] MkfError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Frame {index} offered after the reconstruction finished")]
    Finished { index: usize },
}

/// Why a frame could not be aligned onto the reference markers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error(
        "Insufficient correspondences: {found} usable (need at least {required} non-collinear)"
    )]
    InsufficientCorrespondences { found: usize, required: usize },

    #[error("Optimizer failed: {0}")]
    Optimizer(String),

    #[error("No convergence after {iterations} iterations (mean distance {mean_distance:.4})")]
    NotConverged { iterations: u64, mean_distance: f64 },
}

pub type Result<T> = std::result::Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_error_display() {
        let err = RegistrationError::InsufficientCorrespondences {
            found: 1,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient correspondences: 1 usable (need at least 3 non-collinear)"
        );

        let err = RegistrationError::NotConverged {
            iterations: 200,
            mean_distance: 0.12345,
        };
        assert_eq!(
            err.to_string(),
            "No convergence after 200 iterations (mean distance 0.1235)"
        );
    }

    #[test]
    fn test_fusion_error_from_core() {
        let err: FusionError = MkfError::MissingFrame {
            index: 3,
            reason: "gone".to_string(),
        }
        .into();
        assert!(matches!(err, FusionError::Core(MkfError::MissingFrame { .. })));
        assert_eq!(err.to_string(), "Missing data for frame 3: gone");
    }
}
