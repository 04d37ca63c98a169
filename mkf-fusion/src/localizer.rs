//! 3D marker localization from 2D detections and depth

use log::{debug, warn};
use mkf_core::{
    CameraIntrinsics, Frame, MarkerDetector, MarkerSet, MkfError, ProjectionError, MARKER_COUNT,
};
use nalgebra::Vector3;

use crate::error::Result;

/// Outcome of looking for markers in one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Localization {
    /// The detector reported at least one marker
    Detected(MarkerSet),
    NoMarkersFound,
}

/// Locate every marker identity of `frame` in camera space.
///
/// Each detected identity is placed at the back-projection of its corner
/// centroid, snapped to the nearest pixel. The first detection of an
/// identity wins. Centroids outside the image or without a depth reading
/// leave their slot unobserved.
pub fn localize_markers<D>(
    frame: &Frame,
    intrinsics: &CameraIntrinsics,
    detector: &D,
) -> Result<Localization>
where
    D: MarkerDetector + ?Sized,
{
    intrinsics.check_grid(frame.index, frame.depth.dim())?;

    let detections = detector.detect(frame)?;
    if detections.is_empty() {
        return Ok(Localization::NoMarkersFound);
    }

    let depth = frame.depth.view();
    let mut slots: [Option<Vector3<f64>>; MARKER_COUNT] = [None; MARKER_COUNT];
    for detection in &detections {
        let id = detection.id as usize;
        let Some(slot) = slots.get_mut(id) else {
            debug!("frame {}: ignoring marker id {} outside the rig", frame.index, id);
            continue;
        };
        if slot.is_some() {
            continue;
        }

        let (u, v) = detection.centroid_pixel();
        match intrinsics.back_project_pixel(u, v, &depth) {
            Ok(point) if point.z > 0.0 => *slot = Some(point),
            Ok(_) => debug!(
                "frame {}: marker {} at ({}, {}) has no depth reading",
                frame.index, id, u, v
            ),
            Err(MkfError::Projection(ProjectionError::OutOfBounds { .. })) => warn!(
                "frame {}: marker {} centroid ({}, {}) lies outside the image",
                frame.index, id, u, v
            ),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Localization::Detected(MarkerSet::from_slots(slots)))
}
