use thiserror::Error;
use std::fmt;

/// Primary error type for the kinematics crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// A quaternion with (near) zero or non-finite norm was offered where a
    /// rotation is required
    #[error("Degenerate quaternion for segment {segment}: norm {norm:e}")]
    DegenerateQuaternion {
        /// Segment the quaternion belongs to
        segment: String,
        /// Norm of the offending quaternion
        norm: f64,
    },

    /// A relative rotation was requested before a reference was captured
    #[error("Segment {segment} has not been calibrated")]
    UncalibratedSegment {
        /// Segment without a calibration record
        segment: String,
    },

    /// The frame does not carry a quaternion for every tracked segment
    #[error("Incomplete frame: missing {}", missing.join(", "))]
    IncompleteFrame {
        /// Labels of the segments without a sample, in hierarchy order
        missing: Vec<String>,
    },

    /// The segment label is not part of the skeleton
    #[error("Unknown segment: {segment}")]
    UnknownSegment {
        /// Offending label
        segment: String,
    },

    /// The skeleton definition is inconsistent
    #[error("Invalid skeleton ({kind}): {message}")]
    InvalidSkeleton {
        /// Detailed error message
        message: String,
        /// Category of the defect
        kind: SkeletonDefect,
    },
}

/// Categories of skeleton definition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonDefect {
    /// Two anchors or segments share a label
    DuplicateLabel,
    /// A segment references a parent or anchor that was not declared before it
    UnknownAttachment,
    /// Length is zero, negative or not finite
    InvalidLength,
    /// Rest direction has no usable direction
    InvalidDirection,
    /// No segments were declared
    Empty,
}

impl fmt::Display for SkeletonDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkeletonDefect::DuplicateLabel => write!(f, "duplicate label"),
            SkeletonDefect::UnknownAttachment => write!(f, "unknown attachment"),
            SkeletonDefect::InvalidLength => write!(f, "invalid length"),
            SkeletonDefect::InvalidDirection => write!(f, "invalid direction"),
            SkeletonDefect::Empty => write!(f, "empty"),
        }
    }
}

/// Helper functions for creating common errors
pub mod helpers {
    use super::*;

    /// Create a degenerate quaternion error
    pub fn degenerate(segment: impl Into<String>, norm: f64) -> KinematicsError {
        KinematicsError::DegenerateQuaternion {
            segment: segment.into(),
            norm,
        }
    }

    /// Create an uncalibrated segment error
    pub fn uncalibrated(segment: impl Into<String>) -> KinematicsError {
        KinematicsError::UncalibratedSegment {
            segment: segment.into(),
        }
    }

    /// Create an unknown segment error
    pub fn unknown_segment(segment: impl Into<String>) -> KinematicsError {
        KinematicsError::UnknownSegment {
            segment: segment.into(),
        }
    }

    /// Create a skeleton definition error
    pub fn invalid_skeleton(message: impl Into<String>, kind: SkeletonDefect) -> KinematicsError {
        KinematicsError::InvalidSkeleton {
            message: message.into(),
            kind,
        }
    }
}

/// Type alias for Result with KinematicsError
pub type KinematicsResult<T> = Result<T, KinematicsError>;
