//! Marker-anchored fusion of RGBD frames into one point cloud

pub mod config;
pub mod error;
pub mod localizer;
pub mod pipeline;
pub mod registration;
pub mod suppressor;

pub use config::{PlaneSuppressionConfig, ReconstructionConfig, RegistrationConfig};
pub use error::{FusionError, RegistrationError, Result};
pub use localizer::{localize_markers, Localization};
pub use pipeline::{
    FailureReason, FrameFailure, FrameObservation, FrameOutcome, FusedFrame, FusionStage,
    Reconstruction, ReconstructionResult, ReconstructionState,
};
pub use registration::{Registration, RegistrationSolver};
pub use suppressor::PlaneSuppressor;
