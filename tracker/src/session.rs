//! Batch processing of a recording.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use kinematics::utils::{flexion_deg, quaternion_to_euler};
use kinematics::{ArmTracker, ComponentOrder, Frame, Pose, Quat, Skeleton, TrackerStats};
use recording::Recording;

use crate::config::{AppConfig, InputFormat};

/// Load the recording described by `config.input`.
///
/// `path` is the combined CSV; it is ignored for the Movella format, whose
/// files are listed in the config.
pub fn load_recording(config: &AppConfig, path: Option<&std::path::Path>) -> Result<Recording> {
    let mut recording = match config.input.format {
        InputFormat::Combined => {
            let Some(path) = path else {
                bail!("a combined recording needs an input path");
            };
            recording::read_combined_path(path)
                .with_context(|| format!("loading {}", path.display()))?
        }
        InputFormat::Movella => {
            if config.input.movella_files.is_empty() {
                bail!("no movella_files listed in [input]");
            }
            Recording::from_movella_paths(&config.input.movella_files)?
        }
    };

    let dropped = recording.align();
    if dropped > 0 {
        log::warn!("Dropped {} samples to align stream lengths", dropped);
    }
    recording.decimate(config.replay.stride)?;
    Ok(recording)
}

/// Turn `recording` into segment-labelled frames in canonical component order.
///
/// `[input] order` only applies to combined CSV cells. Movella exports name
/// their `Quat_W..Quat_Z` columns and are always read as w-first.
pub fn frames_for(config: &AppConfig, recording: &Recording) -> Result<Vec<Frame>> {
    let frames = recording.frames(&config.sensors)?;
    let order = match config.input.format {
        InputFormat::Combined => config.input.order,
        InputFormat::Movella => {
            if config.input.order != ComponentOrder::Wxyz {
                log::warn!("Ignoring order {:?} for movella input", config.input.order);
            }
            ComponentOrder::Wxyz
        }
    };
    Ok(match order {
        ComponentOrder::Wxyz => frames,
        order => frames
            .into_iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|(segment, raw)| (segment, Quat::from_components(raw.to_wxyz(), order)))
                    .collect()
            })
            .collect(),
    })
}

/// Poses of one replay, with what had to be skipped
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    /// `(frame index, pose)` for every resolved frame
    pub poses: Vec<(usize, Pose)>,
    /// Indices of frames the tracker refused
    pub rejected: Vec<usize>,
    pub stats: TrackerStats,
    /// Smallest and largest flexion seen at each inner joint, in degrees
    pub flexion_range: BTreeMap<String, (f64, f64)>,
}

impl SessionReport {
    fn record_flexion(&mut self, skeleton: &Skeleton, pose: &Pose) {
        for (segment, child) in skeleton.segments().iter().zip(&pose.segments) {
            let Some(parent) = segment.parent().and_then(|idx| pose.segments.get(idx)) else {
                continue;
            };
            let Some(angle) = flexion_deg((&parent.start, &parent.end), (&child.start, &child.end)) else {
                continue;
            };
            let range = self
                .flexion_range
                .entry(skeleton.start_joint(segment).to_owned())
                .or_insert((angle, angle));
            range.0 = range.0.min(angle);
            range.1 = range.1.max(angle);
        }
    }
}

/// A calibrated tracker plus the frames it will resolve
pub struct Session {
    tracker: ArmTracker,
    frames: Vec<Frame>,
}

impl Session {
    /// Build the tracker from the configured rig and calibrate it on
    /// `config.replay.calibration_frame`.
    pub fn new(config: &AppConfig, frames: Vec<Frame>) -> Result<Self> {
        let skeleton = config.rig.to_skeleton()?;
        let mut tracker = ArmTracker::new(skeleton);

        let index = config.replay.calibration_frame;
        let Some(reference) = frames.get(index) else {
            bail!(
                "calibration frame {} is out of range ({} frames)",
                index,
                frames.len()
            );
        };
        tracker
            .calibrate_frame(reference)
            .with_context(|| format!("calibrating on frame {}", index))?;
        for (segment, q) in reference.iter() {
            let euler = quaternion_to_euler(q);
            log::debug!(
                "Rest pose {}: roll {:.1} pitch {:.1} yaw {:.1}",
                segment,
                euler.x,
                euler.y,
                euler.z
            );
        }

        Ok(Self { tracker, frames })
    }

    pub fn tracker(&self) -> &ArmTracker {
        &self.tracker
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Hand the calibrated tracker and the frames over, e.g. to a replay thread
    pub fn into_parts(self) -> (ArmTracker, Vec<Frame>) {
        (self.tracker, self.frames)
    }

    /// Resolve every frame. Rejected frames are logged and skipped.
    pub fn run(&self) -> SessionReport {
        let mut report = SessionReport::default();
        for (index, frame) in self.frames.iter().enumerate() {
            match self.tracker.resolve_frame(frame) {
                Ok(pose) => {
                    report.record_flexion(self.tracker.skeleton(), &pose);
                    report.poses.push((index, pose));
                }
                Err(e) => {
                    log::warn!("Frame {} skipped: {}", index, e);
                    report.rejected.push(index);
                }
            }
        }
        report.stats = self.tracker.stats();
        log::info!(
            "Resolved {} frames, {} rejected, {} degenerate samples",
            report.stats.frames_resolved,
            report.stats.frames_rejected,
            report.stats.degenerate_samples
        );
        for (joint, (min, max)) in &report.flexion_range {
            log::info!("Flexion at {}: {:.1} to {:.1} deg", joint, min, max);
        }
        report
    }
}
