//! Fiducial marker observations

use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::coordinate::RigidTransform;
use crate::error::Result;
use crate::frame::Frame;

/// Number of distinguishable marker identities on the rig (`0..MARKER_COUNT`)
pub const MARKER_COUNT: usize = 13;

/// Homogeneous placeholder used by flat `(x, y, z, 1)` exports for
/// identities that were not observed
pub const UNOBSERVED: Vector4<f64> = Vector4::new(-1.0, -1.0, -1.0, 1.0);

/// One marker found by a 2D detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Corner pixels `(x, y)` in detector order
    pub corners: [[f64; 2]; 4],
}

impl MarkerDetection {
    /// Mean of the four corners
    pub fn centroid(&self) -> (f64, f64) {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c[0], sy + c[1]));
        (sx / 4.0, sy / 4.0)
    }

    /// Centroid snapped to the pixel grid (ties round to even)
    pub fn centroid_pixel(&self) -> (i64, i64) {
        let (cx, cy) = self.centroid();
        (cx.round_ties_even() as i64, cy.round_ties_even() as i64)
    }
}

/// External 2D fiducial detector
pub trait MarkerDetector {
    /// Every marker visible in `frame`; empty when none was found
    fn detect(&self, frame: &Frame) -> Result<Vec<MarkerDetection>>;
}

/// Camera-space marker positions, one slot per identity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkerSet {
    slots: [Option<Vector3<f64>>; MARKER_COUNT],
}

impl MarkerSet {
    pub fn from_slots(slots: [Option<Vector3<f64>>; MARKER_COUNT]) -> Self {
        Self { slots }
    }

    /// Build from `(identity, point)` pairs; identities out of range are dropped
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (usize, Vector3<f64>)>,
    {
        let mut slots = [None; MARKER_COUNT];
        for (id, point) in observations {
            if let Some(slot) = slots.get_mut(id) {
                *slot = Some(point);
            }
        }
        Self { slots }
    }

    pub fn get(&self, id: usize) -> Option<&Vector3<f64>> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<Vector3<f64>>; MARKER_COUNT] {
        &self.slots
    }

    /// Observed identities and their points, in identity order
    pub fn observed(&self) -> impl Iterator<Item = (usize, &Vector3<f64>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|p| (id, p)))
    }

    pub fn observed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Pairs `(id, self[id], other[id])` for identities observed in both sets
    pub fn correspondences(&self, other: &MarkerSet) -> Vec<(usize, Vector3<f64>, Vector3<f64>)> {
        self.slots
            .iter()
            .zip(other.slots.iter())
            .enumerate()
            .filter_map(|(id, (a, b))| match (a, b) {
                (Some(a), Some(b)) => Some((id, *a, *b)),
                _ => None,
            })
            .collect()
    }

    /// Apply `transform` to every observed marker
    pub fn transformed(&self, transform: &RigidTransform) -> MarkerSet {
        let mut slots = self.slots;
        for p in slots.iter_mut().flatten() {
            *p = transform.apply(p);
        }
        Self { slots }
    }

    /// Flat homogeneous rows with [`UNOBSERVED`] for missing identities
    pub fn to_homogeneous(&self) -> [Vector4<f64>; MARKER_COUNT] {
        self.slots
            .map(|slot| slot.map_or(UNOBSERVED, |p| p.push(1.0)))
    }
}
