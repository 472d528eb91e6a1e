use std::collections::HashSet;

use crate::error::{helpers, KinematicsResult, SkeletonDefect};
use crate::quaternion::Vec3;

/// Fixed joint that does not move with sensor data (a shoulder origin)
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub name: String,
    pub position: Vec3,
}

/// Where a segment starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// At the anchor with this index
    Anchor(usize),
    /// At the end joint of the parent segment with this index
    Segment(usize),
}

/// Rigid body part between two joints
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub start: Start,
    /// Rest-pose extent: unit direction scaled by `length`
    pub rest: Vec3,
    pub length: f64,
    /// Label of the joint at the far end
    pub joint: String,
}

impl Segment {
    /// Index of the parent segment, `None` for segments hanging off an anchor
    pub fn parent(&self) -> Option<usize> {
        match self.start {
            Start::Segment(idx) => Some(idx),
            Start::Anchor(_) => None,
        }
    }
}

/// Immutable segment hierarchy.
///
/// Segments are stored in topological order: a parent always precedes its
/// children, so a single forward pass resolves every joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    anchors: Vec<Anchor>,
    segments: Vec<Segment>,
}

impl Skeleton {
    /// Start a new skeleton definition
    pub fn builder() -> SkeletonBuilder {
        SkeletonBuilder::new()
    }

    /// One arm hanging straight down (-Y) from a shoulder at the origin.
    ///
    /// Joints: `shoulder`, `elbow`, `wrist`. Segments: `upper_arm`, `forearm`.
    pub fn single_arm(upper_arm_length: f64, forearm_length: f64) -> KinematicsResult<Self> {
        let down = -Vec3::y();
        Self::builder()
            .anchor("shoulder", Vec3::zeros())
            .segment("upper_arm", Attach::anchor("shoulder"), down, upper_arm_length, "elbow")
            .segment("forearm", Attach::segment("upper_arm"), down, forearm_length, "wrist")
            .build()
    }

    /// Two arms in a T-pose along ±X from mirrored shoulders at `±shoulder_width / 2`.
    ///
    /// Segments are prefixed `left_` / `right_`, as are the joints.
    pub fn two_arm(
        shoulder_width: f64,
        upper_arm_length: f64,
        forearm_length: f64,
    ) -> KinematicsResult<Self> {
        let half = shoulder_width / 2.0;
        let mut builder = Self::builder();
        for (side, sign) in [("left", -1.0), ("right", 1.0)] {
            let outward = Vec3::x() * sign;
            let shoulder = format!("{side}_shoulder");
            let upper = format!("{side}_upper_arm");
            builder = builder
                .anchor(&shoulder, Vec3::new(sign * half, 0.0, 0.0))
                .segment(&upper, Attach::anchor(&shoulder), outward, upper_arm_length, &format!("{side}_elbow"))
                .segment(
                    &format!("{side}_forearm"),
                    Attach::segment(&upper),
                    outward,
                    forearm_length,
                    &format!("{side}_wrist"),
                );
        }
        builder.build()
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Segments in parent-before-child order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment with `label`
    pub fn segment_index(&self, label: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.label == label)
    }

    pub fn segment(&self, label: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.label == label)
    }

    /// Segment labels in hierarchy order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.label.as_str())
    }

    /// Every joint label: anchors first, then segment end joints
    pub fn joint_labels(&self) -> impl Iterator<Item = &str> {
        self.anchors
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.segments.iter().map(|s| s.joint.as_str()))
    }

    /// Label of the joint a segment starts at
    pub fn start_joint(&self, segment: &Segment) -> &str {
        match segment.start {
            Start::Anchor(idx) => &self.anchors[idx].name,
            Start::Segment(idx) => &self.segments[idx].joint,
        }
    }
}

/// What a new segment is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attach {
    Anchor(String),
    Segment(String),
}

impl Attach {
    pub fn anchor(name: &str) -> Self {
        Attach::Anchor(name.to_owned())
    }

    pub fn segment(label: &str) -> Self {
        Attach::Segment(label.to_owned())
    }
}

#[derive(Debug, Clone)]
struct SegmentDef {
    label: String,
    attach: Attach,
    direction: Vec3,
    length: f64,
    joint: String,
}

/// Incremental skeleton definition; every check happens in [`SkeletonBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct SkeletonBuilder {
    anchors: Vec<Anchor>,
    segments: Vec<SegmentDef>,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fixed joint
    pub fn anchor(mut self, name: &str, position: Vec3) -> Self {
        self.anchors.push(Anchor {
            name: name.to_owned(),
            position,
        });
        self
    }

    /// Declare a segment. Parents and anchors must be declared first.
    pub fn segment(
        mut self,
        label: &str,
        attach: Attach,
        direction: Vec3,
        length: f64,
        joint: &str,
    ) -> Self {
        self.segments.push(SegmentDef {
            label: label.to_owned(),
            attach,
            direction,
            length,
            joint: joint.to_owned(),
        });
        self
    }

    pub fn build(self) -> KinematicsResult<Skeleton> {
        if self.segments.is_empty() {
            return Err(helpers::invalid_skeleton("no segments declared", SkeletonDefect::Empty));
        }

        let mut joints = HashSet::new();
        for anchor in &self.anchors {
            if !joints.insert(anchor.name.as_str()) {
                return Err(helpers::invalid_skeleton(
                    format!("joint `{}` declared twice", anchor.name),
                    SkeletonDefect::DuplicateLabel,
                ));
            }
        }

        let mut segments: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for def in &self.segments {
            if segments.iter().any(|s| s.label == def.label) {
                return Err(helpers::invalid_skeleton(
                    format!("segment `{}` declared twice", def.label),
                    SkeletonDefect::DuplicateLabel,
                ));
            }
            if !joints.insert(def.joint.as_str()) {
                return Err(helpers::invalid_skeleton(
                    format!("joint `{}` declared twice", def.joint),
                    SkeletonDefect::DuplicateLabel,
                ));
            }
            if !def.length.is_finite() || def.length <= 0.0 {
                return Err(helpers::invalid_skeleton(
                    format!("segment `{}` has length {}", def.label, def.length),
                    SkeletonDefect::InvalidLength,
                ));
            }
            let norm = def.direction.norm();
            if !norm.is_finite() || norm < 1e-9 {
                return Err(helpers::invalid_skeleton(
                    format!("segment `{}` has no rest direction", def.label),
                    SkeletonDefect::InvalidDirection,
                ));
            }

            let start = match &def.attach {
                Attach::Anchor(name) => self
                    .anchors
                    .iter()
                    .position(|a| &a.name == name)
                    .map(Start::Anchor),
                Attach::Segment(label) => segments
                    .iter()
                    .position(|s| &s.label == label)
                    .map(Start::Segment),
            }
            .ok_or_else(|| {
                helpers::invalid_skeleton(
                    format!("segment `{}` attaches to undeclared {:?}", def.label, def.attach),
                    SkeletonDefect::UnknownAttachment,
                )
            })?;

            segments.push(Segment {
                label: def.label.clone(),
                start,
                rest: def.direction / norm * def.length,
                length: def.length,
                joint: def.joint.clone(),
            });
        }

        Ok(Skeleton {
            anchors: self.anchors,
            segments,
        })
    }
}
