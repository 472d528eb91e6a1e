//! Forward kinematics.
//!
//! Segments are walked parent-first. A segment hanging off an anchor is
//! rotated by its own calibration-relative rotation; a child segment is
//! rotated by `compose(parent_effective, own_relative)`, so a forearm
//! follows its upper arm even when its own sensor has not moved. A parent
//! whose rotation is degenerate contributes the identity to its children.

use crate::error::{KinematicsError, KinematicsResult};
use crate::frame::{JointPosition, Pose, SegmentPose};
use crate::quaternion::{compose, rotate, Quat};
use crate::skeleton::{Skeleton, Start};

/// Resolve every joint of `skeleton`.
///
/// `relative` holds one calibration-relative rotation per segment, in
/// [`Skeleton::segments`] order. Fewer rotations than segments is an
/// [`KinematicsError::IncompleteFrame`]; nothing is resolved in that case.
///
/// A degenerate rotation never aborts the frame: the segment keeps its rest
/// vector and is listed in [`Pose::degenerate`]. Its children are rotated by
/// their own samples alone and are not listed.
pub fn resolve(skeleton: &Skeleton, relative: &[Quat]) -> KinematicsResult<Pose> {
    if relative.len() < skeleton.len() {
        return Err(KinematicsError::IncompleteFrame {
            missing: skeleton.labels().skip(relative.len()).map(str::to_owned).collect(),
        });
    }

    let mut pose = Pose {
        joints: Vec::with_capacity(skeleton.anchors().len() + skeleton.len()),
        segments: Vec::with_capacity(skeleton.len()),
        degenerate: Vec::new(),
    };
    pose.joints.extend(skeleton.anchors().iter().map(|a| JointPosition {
        joint: a.name.clone(),
        position: a.position,
    }));

    for (segment, own) in skeleton.segments().iter().zip(relative) {
        let (start, rotation) = match segment.start {
            Start::Anchor(idx) => (skeleton.anchors()[idx].position, *own),
            Start::Segment(parent) => {
                let parent = &pose.segments[parent];
                let inherited = if parent.rotation.is_degenerate() {
                    Quat::identity()
                } else {
                    parent.rotation
                };
                (parent.end, compose(inherited, *own))
            }
        };

        if own.is_degenerate() {
            log::trace!("Segment {} left at rest: degenerate rotation", segment.label);
            pose.degenerate.push(segment.label.clone());
        }
        // rotate() falls back to the identity for degenerate input
        let end = start + rotate(&segment.rest, rotation);

        pose.segments.push(SegmentPose {
            segment: segment.label.clone(),
            start,
            end,
            rotation,
        });
        pose.joints.push(JointPosition {
            joint: segment.joint.clone(),
            position: end,
        });
    }

    Ok(pose)
}
