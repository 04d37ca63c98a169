//! Color and depth image decoding into `ndarray` grids

use std::path::Path;

use image::{DynamicImage, ImageReader};
use ndarray::{Array2, Array3};

use crate::error::{IoError, Result};

fn decode(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|e| IoError::file(path, e))?;
    reader.decode().map_err(|source| IoError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an 8-bit color image as `(height, width, 3)` RGB
pub fn read_color(path: &Path) -> Result<Array3<u8>> {
    let rgb = decode(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).map_err(|e| {
        IoError::InvalidImage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

/// Read a 16-bit single-channel depth image as `(height, width)` raw samples.
///
/// Other pixel formats are rejected rather than rescaled, since rescaling
/// would silently change the depth units.
pub fn read_depth(path: &Path) -> Result<Array2<u16>> {
    let DynamicImage::ImageLuma16(depth) = decode(path)? else {
        return Err(IoError::InvalidImage {
            path: path.to_path_buf(),
            reason: "expected 16-bit single channel depth".to_string(),
        });
    };
    let (width, height) = depth.dimensions();
    Array2::from_shape_vec((height as usize, width as usize), depth.into_raw()).map_err(|e| {
        IoError::InvalidImage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}
