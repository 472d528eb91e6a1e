use std::collections::BTreeMap;

use crate::quaternion::{Quat, Vec3};

/// One synchronized sample: a raw orientation per segment label
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    samples: BTreeMap<String, Quat>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the sample for `segment`
    pub fn insert(&mut self, segment: impl Into<String>, orientation: Quat) -> Option<Quat> {
        self.samples.insert(segment.into(), orientation)
    }

    /// Builder-style [`Frame::insert`]
    pub fn with(mut self, segment: impl Into<String>, orientation: Quat) -> Self {
        self.insert(segment, orientation);
        self
    }

    pub fn get(&self, segment: &str) -> Option<Quat> {
        self.samples.get(segment).copied()
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.samples.contains_key(segment)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples ordered by segment label
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quat)> {
        self.samples.iter().map(|(label, q)| (label.as_str(), *q))
    }
}

impl<S: Into<String>> FromIterator<(S, Quat)> for Frame {
    fn from_iter<I: IntoIterator<Item = (S, Quat)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(|(s, q)| (s.into(), q)).collect(),
        }
    }
}

/// Position of one joint in the current frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointPosition {
    pub joint: String,
    pub position: Vec3,
}

/// Effective (world) rotation applied to one segment in the current frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentPose {
    pub segment: String,
    pub start: Vec3,
    pub end: Vec3,
    pub rotation: Quat,
}

/// Resolved skeleton for a single frame
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Anchors first, then segment end joints in hierarchy order
    pub joints: Vec<JointPosition>,
    pub segments: Vec<SegmentPose>,
    /// Segments whose effective rotation was degenerate and left unrotated
    pub degenerate: Vec<String>,
}

impl Pose {
    /// Position of `joint`
    pub fn joint(&self, joint: &str) -> Option<Vec3> {
        self.joints
            .iter()
            .find(|j| j.joint == joint)
            .map(|j| j.position)
    }

    pub fn segment(&self, segment: &str) -> Option<&SegmentPose> {
        self.segments.iter().find(|s| s.segment == segment)
    }

    /// Number of joints
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// True if every segment was rotated by a usable quaternion
    pub fn is_clean(&self) -> bool {
        self.degenerate.is_empty()
    }
}
