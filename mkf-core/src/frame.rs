//! RGBD frames and the sources that produce them

use ndarray::{Array2, Array3};

use crate::camera::CameraIntrinsics;
use crate::error::Result;
use crate::pointcloud::PointCloud;

/// One color + depth capture
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    /// 8-bit RGB, shape `(height, width, 3)`
    pub color: Array3<u8>,
    /// Raw depth samples, shape `(height, width)`; zero means no reading
    pub depth: Array2<u16>,
}

impl Frame {
    pub fn new(index: usize, color: Array3<u8>, depth: Array2<u16>) -> Self {
        Self {
            index,
            color,
            depth,
        }
    }

    /// Back-project the whole frame after checking it against `intrinsics`
    pub fn to_point_cloud(&self, intrinsics: &CameraIntrinsics) -> Result<PointCloud> {
        intrinsics.check_grid(self.index, self.depth.dim())?;
        PointCloud::from_rgbd(&self.color.view(), &self.depth.view(), intrinsics)
    }
}

/// Indexed access to a recorded frame sequence
pub trait FrameSource {
    /// Number of frames, addressed as `0..frame_count()`
    fn frame_count(&self) -> usize;

    /// Load frame `index`; fails with [`crate::MkfError::MissingFrame`]
    /// when its color/depth pair does not exist.
    fn frame(&mut self, index: usize) -> Result<Frame>;
}

/// In-memory frame sequence
#[derive(Debug, Clone, Default)]
pub struct FrameList {
    frames: Vec<Frame>,
}

impl FrameList {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for FrameList {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&mut self, index: usize) -> Result<Frame> {
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| crate::MkfError::MissingFrame {
                index,
                reason: format!("sequence holds {} frames", self.frames.len()),
            })
    }
}
