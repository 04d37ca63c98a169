use thiserror::Error;

/// Common errors across the fusion pipeline
#[derive(Error, Debug)]
pub enum MkfError {
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Plane fit error: {0}")]
    PlaneFit(#[from] PlaneFitError),

    #[error("Missing data for frame {index}: {reason}")]
    MissingFrame { index: usize, reason: String },

    #[error("Frame {index}: depth grid is {found:?} but intrinsics expect {expected:?}")]
    DimensionMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical error: {0}")]
    Numerical(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Pixel ({u}, {v}) outside image bounds {width}x{height}")]
    OutOfBounds {
        u: i64,
        v: i64,
        width: usize,
        height: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaneFitError {
    #[error("Too few points for a plane fit: {found} (need at least {required})")]
    TooFewPoints { found: usize, required: usize },

    #[error("No non-degenerate plane found after {iterations} iterations")]
    Degenerate { iterations: usize },
}

pub type Result<T> = std::result::Result<T, MkfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_error_display() {
        let err = ProjectionError::OutOfBounds {
            u: 700,
            v: -1,
            width: 640,
            height: 480,
        };
        assert_eq!(err.to_string(), "Pixel (700, -1) outside image bounds 640x480");
    }

    #[test]
    fn test_plane_fit_error_display() {
        let err = PlaneFitError::TooFewPoints {
            found: 2,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "Too few points for a plane fit: 2 (need at least 3)"
        );

        let err = PlaneFitError::Degenerate { iterations: 1000 };
        assert_eq!(
            err.to_string(),
            "No non-degenerate plane found after 1000 iterations"
        );
    }

    #[test]
    fn test_mkf_error_from_projection_error() {
        let proj_err = ProjectionError::OutOfBounds {
            u: 0,
            v: 480,
            width: 640,
            height: 480,
        };
        let err: MkfError = proj_err.into();
        assert!(matches!(err, MkfError::Projection(_)));
    }

    #[test]
    fn test_mkf_error_from_plane_fit_error() {
        let fit_err = PlaneFitError::Degenerate { iterations: 10 };
        let err: MkfError = fit_err.into();
        assert!(matches!(err, MkfError::PlaneFit(_)));
    }

    #[test]
    fn test_missing_frame_display() {
        let err = MkfError::MissingFrame {
            index: 7,
            reason: "color/7.jpg not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing data for frame 7: color/7.jpg not found"
        );
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = MkfError::DimensionMismatch {
            index: 2,
            expected: (480, 640),
            found: (240, 320),
        };
        assert_eq!(
            err.to_string(),
            "Frame 2: depth grid is (240, 320) but intrinsics expect (480, 640)"
        );
    }

    #[test]
    fn test_mkf_error_invalid_input() {
        let err = MkfError::InvalidInput("Invalid parameter".to_string());
        assert_eq!(err.to_string(), "Invalid input: Invalid parameter");
    }
}
