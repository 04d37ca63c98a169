//! Core data model for marker-anchored RGBD fusion

pub mod camera;
pub mod coordinate;
pub mod error;
pub mod frame;
pub mod marker;
pub mod plane;
pub mod pointcloud;
pub mod ransac;

pub use camera::{CameraIntrinsics, CameraModel};
pub use coordinate::RigidTransform;
pub use error::{MkfError, PlaneFitError, ProjectionError, Result};
pub use frame::{Frame, FrameList, FrameSource};
pub use marker::{MarkerDetection, MarkerDetector, MarkerSet, MARKER_COUNT};
pub use plane::{segment_plane, Plane, PlaneSegmentation};
pub use pointcloud::{PointCloud, Rgb};
pub use ransac::RansacOptions;
