use std::collections::HashMap;

use crate::error::{helpers, KinematicsResult};
use crate::quaternion::{compose, inverse, normalize, Quat};

/// Reference ("zero") orientation per segment.
///
/// Each record is captured while the wearer holds the agreed rest pose; the
/// pose itself cannot be verified here. A record is replaced, never updated,
/// when a segment is calibrated again.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    references: HashMap<String, Quat>,
}

impl Calibration {
    /// Create an empty calibration
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the normalized `reference` for `segment`.
    ///
    /// A degenerate reference is rejected and any previous record for the
    /// segment is left untouched.
    pub fn calibrate(&mut self, segment: &str, reference: Quat) -> KinematicsResult<()> {
        let reference =
            normalize(reference).ok_or_else(|| helpers::degenerate(segment, reference.norm()))?;
        if self.references.insert(segment.to_owned(), reference).is_some() {
            log::debug!("Recalibrated segment {}", segment);
        }
        Ok(())
    }

    /// Rotation since calibration, in world coordinates: `live * reference⁻¹`
    ///
    /// A degenerate `live` sample yields a degenerate result; rotating by it
    /// falls back to the identity further down.
    pub fn relative_rotation(&self, segment: &str, live: Quat) -> KinematicsResult<Quat> {
        let reference = self
            .references
            .get(segment)
            .ok_or_else(|| helpers::uncalibrated(segment))?;
        let live = normalize(live).unwrap_or(Quat::new(0.0, 0.0, 0.0, 0.0));
        Ok(compose(live, inverse(*reference)))
    }

    /// Whether `segment` has a reference
    pub fn is_calibrated(&self, segment: &str) -> bool {
        self.references.contains_key(segment)
    }

    /// Stored (normalized) reference for `segment`
    pub fn reference(&self, segment: &str) -> Option<Quat> {
        self.references.get(segment).copied()
    }

    /// Number of calibrated segments
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// True if no segment has been calibrated
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Drop every record, e.g. before a deliberate re-calibration of the rig
    pub fn clear(&mut self) {
        self.references.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KinematicsError;
    use crate::quaternion::{rotate, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_when_live_equals_reference() {
        let reference = Quat::from_axis_angle(&Vec3::new(0.3, -1.0, 0.2), 1.2);
        let mut calibration = Calibration::new();
        calibration.calibrate("upper_arm", reference).unwrap();

        let delta = calibration.relative_rotation("upper_arm", reference).unwrap();
        assert!(delta.is_identity(1e-12));

        let v = Vec3::new(0.0, -0.4, 0.0);
        assert_relative_eq!(rotate(&v, delta), v, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_rotation_is_world_frame_delta() {
        let reference = Quat::from_axis_angle(&Vec3::x(), 0.9);
        let motion = Quat::from_axis_angle(&Vec3::z(), 0.4);
        let live = motion * reference;

        let mut calibration = Calibration::new();
        calibration.calibrate("forearm", reference).unwrap();
        let delta = calibration.relative_rotation("forearm", live).unwrap();

        assert_relative_eq!(delta.angle_to(&motion).unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reference_is_normalized() {
        let mut calibration = Calibration::new();
        calibration.calibrate("forearm", Quat::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(calibration.reference("forearm"), Some(Quat::identity()));
    }

    #[test]
    fn test_uncalibrated_segment_is_reported() {
        let calibration = Calibration::new();
        let err = calibration
            .relative_rotation("forearm", Quat::identity())
            .unwrap_err();
        assert_eq!(
            err,
            KinematicsError::UncalibratedSegment {
                segment: "forearm".into()
            }
        );
    }

    #[test]
    fn test_degenerate_reference_is_rejected() {
        let mut calibration = Calibration::new();
        calibration.calibrate("forearm", Quat::identity()).unwrap();

        let err = calibration
            .calibrate("forearm", Quat::new(0.0, 0.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, KinematicsError::DegenerateQuaternion { .. }));
        // previous record survives
        assert_eq!(calibration.reference("forearm"), Some(Quat::identity()));
    }

    #[test]
    fn test_recalibration_replaces_record() {
        let first = Quat::from_axis_angle(&Vec3::y(), 0.5);
        let second = Quat::from_axis_angle(&Vec3::y(), -0.5);
        let mut calibration = Calibration::new();
        calibration.calibrate("upper_arm", first).unwrap();
        calibration.calibrate("upper_arm", second).unwrap();

        assert_eq!(calibration.len(), 1);
        let delta = calibration.relative_rotation("upper_arm", second).unwrap();
        assert!(delta.is_identity(1e-12));
    }

    #[test]
    fn test_degenerate_live_sample_stays_degenerate() {
        let mut calibration = Calibration::new();
        calibration.calibrate("upper_arm", Quat::identity()).unwrap();
        let delta = calibration
            .relative_rotation("upper_arm", Quat::new(0.0, 0.0, 0.0, 0.0))
            .unwrap();
        assert!(delta.is_degenerate());
    }

    #[test]
    fn test_clear() {
        let mut calibration = Calibration::new();
        calibration.calibrate("upper_arm", Quat::identity()).unwrap();
        assert!(calibration.is_calibrated("upper_arm"));
        calibration.clear();
        assert!(calibration.is_empty());
        assert!(!calibration.is_calibrated("upper_arm"));
    }
}
