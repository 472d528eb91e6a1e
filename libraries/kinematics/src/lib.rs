//! # Kinematics - arm pose reconstruction
//!
//! Turns per-segment orientation quaternions from wearable inertial sensors
//! into joint positions of a jointed arm skeleton anchored at fixed shoulder
//! origins.
//!
//! ## Layers
//!
//! - [`quaternion`]: normalization, vector rotation, composition, inverse
//! - [`calibration`]: reference orientation per segment and the rotation
//!   that happened since
//! - [`resolver`]: hierarchical forward kinematics over a [`Skeleton`]
//!
//! [`ArmTracker`] ties the three together behind the two calls a frame
//! driver needs: [`ArmTracker::calibrate`] and [`ArmTracker::resolve_frame`].
//! [`slot`] hands frames from an acquisition thread to the resolving thread.
//!
//! ## Features
//!
//! - **serde**: `Serialize`/`Deserialize` for [`Quat`], [`Frame`], [`Pose`]
//!   and [`ComponentOrder`]

use std::sync::atomic::{AtomicU64, Ordering};

pub mod calibration;
pub mod error;
pub mod frame;
pub mod quaternion;
pub mod resolver;
pub mod skeleton;
pub mod slot;
pub mod utils;

pub use calibration::Calibration;
pub use error::{KinematicsError, KinematicsResult, SkeletonDefect};
pub use frame::{Frame, JointPosition, Pose, SegmentPose};
pub use quaternion::{ComponentOrder, Quat, Vec3};
pub use skeleton::{Attach, Skeleton, SkeletonBuilder};
pub use slot::{frame_slot, FrameReader, FrameWriter};

use crate::error::helpers;

/// Counters describing what the tracker has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Frames turned into a pose
    pub frames_resolved: u64,

    /// Frames refused (incomplete or uncalibrated)
    pub frames_rejected: u64,

    /// Segment samples that could not rotate and were left at rest
    pub degenerate_samples: u64,
}

/// Skeleton plus calibration: the in-process interface of the core.
///
/// Calibrate with `&mut self` before consumption starts; resolving only needs
/// `&self`, so a calibrated tracker can be moved to, or shared with, the
/// thread that consumes frames.
#[derive(Debug)]
pub struct ArmTracker {
    skeleton: Skeleton,
    calibration: Calibration,
    frames_resolved: AtomicU64,
    frames_rejected: AtomicU64,
    degenerate_samples: AtomicU64,
}

impl ArmTracker {
    /// Create an uncalibrated tracker for `skeleton`
    pub fn new(skeleton: Skeleton) -> Self {
        Self {
            skeleton,
            calibration: Calibration::new(),
            frames_resolved: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            degenerate_samples: AtomicU64::new(0),
        }
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Capture the rest-pose reference for one segment
    pub fn calibrate(&mut self, segment: &str, reference: Quat) -> KinematicsResult<()> {
        if self.skeleton.segment_index(segment).is_none() {
            return Err(helpers::unknown_segment(segment));
        }
        self.calibration.calibrate(segment, reference)?;
        log::info!("Calibrated segment {}", segment);
        Ok(())
    }

    /// Capture references for every segment from one complete frame.
    ///
    /// Either every segment is calibrated or, on error, none is changed.
    pub fn calibrate_frame(&mut self, frame: &Frame) -> KinematicsResult<()> {
        let missing = self.missing_segments(frame);
        if !missing.is_empty() {
            return Err(KinematicsError::IncompleteFrame { missing });
        }

        let mut calibration = self.calibration.clone();
        for (label, reference) in self
            .skeleton
            .labels()
            .filter_map(|label| frame.get(label).map(|q| (label, q)))
        {
            calibration.calibrate(label, reference)?;
        }
        self.calibration = calibration;
        log::info!("Calibrated {} segments from frame", self.skeleton.len());
        Ok(())
    }

    /// True once every segment has a reference
    pub fn is_calibrated(&self) -> bool {
        self.skeleton
            .labels()
            .all(|label| self.calibration.is_calibrated(label))
    }

    /// Resolve the joint positions for one frame.
    ///
    /// The whole frame is rejected if a segment has no sample
    /// ([`KinematicsError::IncompleteFrame`]) or no reference
    /// ([`KinematicsError::UncalibratedSegment`]). Samples for labels outside
    /// the skeleton are ignored.
    pub fn resolve_frame(&self, frame: &Frame) -> KinematicsResult<Pose> {
        match self.try_resolve(frame) {
            Ok(pose) => {
                self.frames_resolved.fetch_add(1, Ordering::Relaxed);
                if !pose.degenerate.is_empty() {
                    self.degenerate_samples
                        .fetch_add(pose.degenerate.len() as u64, Ordering::Relaxed);
                    for segment in &pose.degenerate {
                        log::warn!("Degenerate orientation for segment {}, holding rest pose", segment);
                    }
                }
                Ok(pose)
            }
            Err(e) => {
                self.frames_rejected.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn try_resolve(&self, frame: &Frame) -> KinematicsResult<Pose> {
        let missing = self.missing_segments(frame);
        if !missing.is_empty() {
            return Err(KinematicsError::IncompleteFrame { missing });
        }
        for (label, _) in frame.iter() {
            if self.skeleton.segment_index(label).is_none() {
                log::debug!("Ignoring sample for unknown segment {}", label);
            }
        }

        let relative = self
            .skeleton
            .labels()
            .map(|label| {
                let live = frame.get(label).ok_or_else(|| KinematicsError::IncompleteFrame {
                    missing: vec![label.to_owned()],
                })?;
                self.calibration.relative_rotation(label, live)
            })
            .collect::<KinematicsResult<Vec<_>>>()?;

        resolver::resolve(&self.skeleton, &relative)
    }

    fn missing_segments(&self, frame: &Frame) -> Vec<String> {
        self.skeleton
            .labels()
            .filter(|label| !frame.contains(label))
            .map(str::to_owned)
            .collect()
    }

    /// Segment samples left at rest because their rotation was degenerate
    pub fn degenerate_samples(&self) -> u64 {
        self.degenerate_samples.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            frames_resolved: self.frames_resolved.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            degenerate_samples: self.degenerate_samples.load(Ordering::Relaxed),
        }
    }
}
