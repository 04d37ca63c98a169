//! Frame-by-frame fusion into one reference-anchored cloud

use std::ops::Range;

use log::{info, warn};
use mkf_core::{
    CameraIntrinsics, Frame, FrameSource, MarkerDetector, MarkerSet, PlaneFitError, PointCloud,
    RigidTransform,
};
use thiserror::Error;

use crate::config::ReconstructionConfig;
use crate::error::{FusionError, RegistrationError, Result};
use crate::localizer::{localize_markers, Localization};
use crate::registration::RegistrationSolver;
use crate::suppressor::PlaneSuppressor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionStage {
    /// No frame has produced markers yet
    AwaitingReference,
    Accumulating,
    Done,
}

/// Everything the fusion step needs to know about one frame
#[derive(Debug, Clone)]
pub enum FrameObservation {
    PlaneFitFailed(PlaneFitError),
    Observed {
        /// Back-projected frame with the support plane removed
        cloud: PointCloud,
        localization: Localization,
    },
}

/// Why a frame was left out of the fused cloud
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("plane fit failed: {0}")]
    PlaneFitDegenerate(PlaneFitError),

    #[error("no markers found")]
    NoMarkersFound,

    #[error("registration failed: {0}")]
    Registration(RegistrationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameFailure {
    pub index: usize,
    pub reason: FailureReason,
}

/// Record of one frame merged into the cloud
#[derive(Debug, Clone, PartialEq)]
pub struct FusedFrame {
    pub index: usize,
    /// Warm start handed to the solver
    pub initial_guess: RigidTransform,
    /// Frame-to-reference transform applied to the frame cloud
    pub transform: RigidTransform,
    pub mean_distance: f64,
    pub iterations: u64,
    /// Marker identities shared with the reference
    pub correspondences: Vec<usize>,
    /// Points contributed to the fused cloud
    pub points: usize,
}

/// What [`ReconstructionState::integrate`] did with a frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The frame became the reference
    Reference,
    Fused,
    Skipped(FailureReason),
}

/// Loop state of a reconstruction run.
///
/// The first frame with markers becomes the reference. Every later frame is
/// registered against the reference markers, seeded with the previous
/// successful transform.
#[derive(Debug, Clone)]
pub struct ReconstructionState {
    stage: FusionStage,
    reference_index: Option<usize>,
    reference_markers: Option<MarkerSet>,
    warm_start: RigidTransform,
    cloud: PointCloud,
    failures: Vec<FrameFailure>,
    fused: Vec<FusedFrame>,
}

impl Default for ReconstructionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconstructionState {
    pub fn new() -> Self {
        Self {
            stage: FusionStage::AwaitingReference,
            reference_index: None,
            reference_markers: None,
            warm_start: RigidTransform::identity(),
            cloud: PointCloud::new(),
            failures: Vec::new(),
            fused: Vec::new(),
        }
    }

    pub fn stage(&self) -> FusionStage {
        self.stage
    }

    pub fn reference_index(&self) -> Option<usize> {
        self.reference_index
    }

    pub fn reference_markers(&self) -> Option<&MarkerSet> {
        self.reference_markers.as_ref()
    }

    /// Initial guess for the next registration
    pub fn warm_start(&self) -> &RigidTransform {
        &self.warm_start
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn failures(&self) -> &[FrameFailure] {
        &self.failures
    }

    pub fn failed_frame_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    pub fn fused_frames(&self) -> &[FusedFrame] {
        &self.fused
    }

    /// Fold one frame into the state.
    ///
    /// Recoverable problems are recorded as a failure for `index` and leave
    /// everything else untouched.
    pub fn integrate(
        &mut self,
        index: usize,
        observation: FrameObservation,
        solver: &RegistrationSolver,
    ) -> Result<FrameOutcome> {
        let (mut cloud, markers) = match (self.stage, observation) {
            (FusionStage::Done, _) => return Err(FusionError::Finished { index }),
            (_, FrameObservation::PlaneFitFailed(e)) => {
                return Ok(self.skip(index, FailureReason::PlaneFitDegenerate(e)));
            }
            (_, FrameObservation::Observed { localization: Localization::NoMarkersFound, .. }) => {
                return Ok(self.skip(index, FailureReason::NoMarkersFound));
            }
            (
                _,
                FrameObservation::Observed {
                    cloud,
                    localization: Localization::Detected(markers),
                },
            ) => (cloud, markers),
        };

        let Some(reference) = self.reference_markers.as_ref() else {
            let found = markers.observed_count();
            let required = solver.required_correspondences();
            if found < required {
                warn!(
                    "frame {}: only {} usable markers, cannot anchor the reference",
                    index, found
                );
                return Ok(self.skip(
                    index,
                    FailureReason::Registration(RegistrationError::InsufficientCorrespondences {
                        found,
                        required,
                    }),
                ));
            }
            self.reference_index = Some(index);
            self.reference_markers = Some(markers);
            self.warm_start = RigidTransform::identity();
            self.cloud = cloud;
            self.stage = FusionStage::Accumulating;
            return Ok(FrameOutcome::Reference);
        };

        let registration = match solver.solve(&markers, reference, &self.warm_start) {
            Ok(registration) => registration,
            Err(e) => return Ok(self.skip(index, FailureReason::Registration(e))),
        };

        cloud.transform(&registration.transform);
        let points = cloud.len();
        self.cloud.union(cloud);
        self.fused.push(FusedFrame {
            index,
            initial_guess: self.warm_start,
            transform: registration.transform,
            mean_distance: registration.mean_distance,
            iterations: registration.iterations,
            correspondences: registration.correspondences,
            points,
        });
        self.warm_start = registration.transform;
        Ok(FrameOutcome::Fused)
    }

    fn skip(&mut self, index: usize, reason: FailureReason) -> FrameOutcome {
        self.failures.push(FrameFailure {
            index,
            reason: reason.clone(),
        });
        FrameOutcome::Skipped(reason)
    }

    /// No further frames will be integrated
    pub fn finish(&mut self) {
        self.stage = FusionStage::Done;
    }

    pub fn into_result(mut self) -> ReconstructionResult {
        self.finish();
        ReconstructionResult {
            cloud: self.cloud,
            reference_index: self.reference_index,
            reference_markers: self.reference_markers,
            failures: self.failures,
            fused: self.fused,
        }
    }
}

/// Output of a finished run
#[derive(Debug, Clone)]
pub struct ReconstructionResult {
    /// Fused cloud, in the reference frame's camera coordinates
    pub cloud: PointCloud,
    /// `None` when no frame produced markers
    pub reference_index: Option<usize>,
    pub reference_markers: Option<MarkerSet>,
    /// Skipped frames in processing order
    pub failures: Vec<FrameFailure>,
    /// Registered frames in processing order (the reference is not listed)
    pub fused: Vec<FusedFrame>,
}

impl ReconstructionResult {
    pub fn failed_frame_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

/// Drives frames from a [`FrameSource`] through suppression, localization
/// and registration
#[derive(Debug, Clone)]
pub struct Reconstruction {
    intrinsics: CameraIntrinsics,
    suppressor: PlaneSuppressor,
    solver: RegistrationSolver,
}

impl Reconstruction {
    pub fn new(intrinsics: CameraIntrinsics, config: &ReconstructionConfig) -> Result<Self> {
        intrinsics.validate()?;
        config.validate()?;
        Ok(Self {
            intrinsics,
            suppressor: PlaneSuppressor::new(&config.plane),
            solver: RegistrationSolver::new(config.registration.clone()),
        })
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Turn a raw frame into what the fusion step consumes
    pub fn observe<D>(&self, frame: &Frame, detector: &D) -> Result<FrameObservation>
    where
        D: MarkerDetector + ?Sized,
    {
        let cloud = frame.to_point_cloud(&self.intrinsics)?;
        let cloud = match self.suppressor.suppress(cloud) {
            Ok(cloud) => cloud,
            Err(e) => return Ok(FrameObservation::PlaneFitFailed(e)),
        };
        let localization = localize_markers(frame, &self.intrinsics, detector)?;
        Ok(FrameObservation::Observed {
            cloud,
            localization,
        })
    }

    /// Fuse every frame of `source`
    pub fn run<S, D>(&self, source: &mut S, detector: &D) -> Result<ReconstructionResult>
    where
        S: FrameSource + ?Sized,
        D: MarkerDetector + ?Sized,
    {
        let count = source.frame_count();
        self.run_range(source, detector, 0..count)
    }

    /// Fuse frames `range` of `source` in order.
    ///
    /// A missing or malformed frame aborts the run; frames that merely
    /// cannot be aligned are recorded and skipped.
    pub fn run_range<S, D>(
        &self,
        source: &mut S,
        detector: &D,
        range: Range<usize>,
    ) -> Result<ReconstructionResult>
    where
        S: FrameSource + ?Sized,
        D: MarkerDetector + ?Sized,
    {
        let mut state = ReconstructionState::new();
        for index in range {
            let frame = source.frame(index)?;
            let observation = self.observe(&frame, detector)?;
            match state.integrate(index, observation, &self.solver)? {
                FrameOutcome::Reference => info!(
                    "frame {}: reference with {} markers, {} points",
                    index,
                    state.reference_markers().map_or(0, MarkerSet::observed_count),
                    state.cloud().len()
                ),
                FrameOutcome::Fused => {
                    if let Some(fused) = state.fused_frames().last() {
                        info!(
                            "frame {}: fused {} points ({} markers, mean distance {:.4})",
                            index,
                            fused.points,
                            fused.correspondences.len(),
                            fused.mean_distance
                        );
                    }
                }
                FrameOutcome::Skipped(reason) => warn!("frame {}: skipped, {}", index, reason),
            }
        }

        let result = state.into_result();
        info!(
            "fused cloud has {} points; {} frames skipped",
            result.cloud.len(),
            result.failures.len()
        );
        Ok(result)
    }
}
