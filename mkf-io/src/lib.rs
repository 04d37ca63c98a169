//! File-system adapters: datasets, intrinsics, detections, PLY and reports

pub mod config;
pub mod detections;
pub mod error;
pub mod frames;
pub mod image;
pub mod intrinsics;
pub mod ply;
pub mod report;

pub use config::load_config;
pub use detections::SidecarDetections;
pub use error::{IoError, Result};
pub use frames::FrameDirectory;
pub use intrinsics::load_intrinsics;
pub use ply::{write_ply, write_ply_to};
pub use report::{FailureEntry, FailureKind, FusedEntry, RunReport};
