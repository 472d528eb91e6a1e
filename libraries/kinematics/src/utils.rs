use crate::quaternion::{Quat, Vec3};

/// Convert degrees to radians
pub fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

/// Convert radians to degrees
pub fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Convert a quaternion to Euler angles (roll, pitch, yaw) in degrees.
///
/// Pitch saturates at ±90° at the gimbal-lock singularity. Degenerate input
/// gives zeros.
pub fn quaternion_to_euler(q: Quat) -> Vec3 {
    let Some(q) = q.normalized() else {
        return Vec3::zeros();
    };
    let Quat { w, x, y, z } = q;

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        sinp.signum() * core::f64::consts::FRAC_PI_2
    } else {
        sinp.asin()
    };

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    Vec3::new(rad_to_deg(roll), rad_to_deg(pitch), rad_to_deg(yaw))
}

/// Unsigned angle between two vectors in radians, `None` if either is ~zero
pub fn angle_between(a: &Vec3, b: &Vec3) -> Option<f64> {
    let denom = a.norm() * b.norm();
    if !denom.is_finite() || denom < 1e-12 {
        return None;
    }
    Some((a.dot(b) / denom).clamp(-1.0, 1.0).acos())
}

/// Flexion at the joint shared by two consecutive segments, in degrees.
///
/// 0° when the segments are in line, 90° for a right angle.
pub fn flexion_deg(parent: (&Vec3, &Vec3), child: (&Vec3, &Vec3)) -> Option<f64> {
    angle_between(&(parent.1 - parent.0), &(child.1 - child.0)).map(rad_to_deg)
}
