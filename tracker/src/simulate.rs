//! Synthetic motion for exercising the pipeline without sensors.

use std::path::Path;

use anyhow::{bail, Context, Result};
use core::f64::consts::{FRAC_PI_2, PI};
use kinematics::{ComponentOrder, Frame, Quat, Skeleton, Vec3};
use recording::CombinedWriter;

use crate::config::AppConfig;

/// Bicep curl over `frames` frames.
///
/// Segments hanging off an anchor hold still. Every child segment swings
/// from rest up to 90° and back, `90° · sin(π·t)`, about the axis
/// perpendicular to its rest direction and +Y (+X when the rest direction
/// is vertical). The first and last frames are the rest pose.
pub fn bicep_curl(skeleton: &Skeleton, frames: usize) -> Vec<Frame> {
    let axes: Vec<(&str, Option<Vec3>)> = skeleton
        .segments()
        .iter()
        .map(|segment| {
            let axis = segment.parent().map(|_| {
                let axis = segment.rest.cross(&Vec3::y());
                if axis.norm() < 1e-9 {
                    Vec3::x()
                } else {
                    axis
                }
            });
            (segment.label.as_str(), axis)
        })
        .collect();

    let last = frames.saturating_sub(1).max(1) as f64;
    (0..frames)
        .map(|i| {
            let angle = FRAC_PI_2 * (PI * i as f64 / last).sin();
            axes.iter()
                .map(|(label, axis)| match axis {
                    Some(axis) => (*label, Quat::from_axis_angle(axis, angle)),
                    None => (*label, Quat::identity()),
                })
                .collect::<Frame>()
        })
        .collect()
}

/// Write a bicep curl for every configured sensor to `path` as a combined
/// CSV, cells in `[input] order`. Returns the number of rows written.
pub fn write_simulation(config: &AppConfig, path: &Path, frames: usize) -> Result<usize> {
    if frames == 0 {
        bail!("a simulation needs at least one frame");
    }
    let skeleton = config.rig.to_skeleton()?;
    for (sensor, segment) in &config.sensors {
        if skeleton.segment_index(segment).is_none() {
            bail!("sensor {} is mapped to unknown segment {}", sensor, segment);
        }
    }

    let sensors: Vec<String> = config.sensors.keys().cloned().collect();
    let mut writer = CombinedWriter::create(path, sensors)
        .with_context(|| format!("creating {}", path.display()))?;
    for frame in bicep_curl(&skeleton, frames) {
        let row: Vec<Option<Quat>> = config
            .sensors
            .values()
            .map(|segment| frame.get(segment).map(|q| raw_cell(q, config.input.order)))
            .collect();
        writer.write_sample(&row)?;
    }
    writer.flush()?;

    log::info!(
        "Simulated {} frames for {} sensors into {}",
        writer.rows(),
        writer.sensors().len(),
        path.display()
    );
    Ok(writer.rows())
}

// The writer emits w-first cells; lay the tuple out so reading it back with
// `order` yields `q`.
fn raw_cell(q: Quat, order: ComponentOrder) -> Quat {
    match order {
        ComponentOrder::Wxyz => q,
        ComponentOrder::Xyzw => Quat::from_wxyz(q.to_xyzw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{frames_for, Session};
    use approx::assert_relative_eq;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("armtrack_{}_{}.csv", name, std::process::id()))
    }

    #[test]
    fn test_curl_moves_forearm_only() {
        let skeleton = Skeleton::single_arm(0.4, 0.35).unwrap();
        let frames = bicep_curl(&skeleton, 5);

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].get("forearm"), Some(Quat::identity()));
        assert!(frames.iter().all(|f| f.get("upper_arm") == Some(Quat::identity())));
        let peak = frames[2].get("forearm").unwrap();
        assert_relative_eq!(peak.angle_to(&Quat::identity()).unwrap(), FRAC_PI_2, epsilon = 1e-12);
        // vertical forearm curls about X
        assert_relative_eq!(peak.vector().normalize(), Vec3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_simulated_file_replays_full_flexion() {
        let path = temp_path("curl");
        let mut config = AppConfig::default();
        config.replay.stride = 1;

        assert_eq!(write_simulation(&config, &path, 21).unwrap(), 21);
        let recording = recording::read_combined(std::fs::File::open(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(recording.frame_count(), 21);
        assert_eq!(recording.skipped_rows(), 0);

        let frames = frames_for(&config, &recording).unwrap();
        let report = Session::new(&config, frames).unwrap().run();

        assert!(report.rejected.is_empty());
        for elbow in ["left_elbow", "right_elbow"] {
            let (min, max) = report.flexion_range[elbow];
            // cells carry four decimals
            assert_relative_eq!(min, 0.0, epsilon = 0.05);
            assert_relative_eq!(max, 90.0, epsilon = 0.05);
        }
    }

    #[test]
    fn test_simulation_honours_xyzw_order() {
        let path = temp_path("xyzw");
        let mut config = AppConfig::default();
        config.input.order = ComponentOrder::Xyzw;

        write_simulation(&config, &path, 3).unwrap();
        let recording = recording::read_combined_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let frames = frames_for(&config, &recording).unwrap();
        assert_eq!(frames[0].get("left_upper_arm"), Some(Quat::identity()));
        let peak = frames[1].get("right_forearm").unwrap();
        assert_relative_eq!(peak.angle_to(&Quat::identity()).unwrap(), FRAC_PI_2, epsilon = 1e-3);
    }

    #[test]
    fn test_unknown_segment_mapping_is_rejected() {
        let mut config = AppConfig::default();
        config.sensors.insert("tracker_9".into(), "tail".into());
        assert!(write_simulation(&config, &temp_path("unknown"), 3).is_err());
    }
}
