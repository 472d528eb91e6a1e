use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kinematics::{Attach, ComponentOrder, Skeleton, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Body geometry.
    pub rig: RigConfig,
    /// Sensor label to segment label.
    pub sensors: BTreeMap<String, String>,
    /// Where samples come from and how to read them.
    pub input: InputConfig,
    /// Replay pacing and calibration.
    pub replay: ReplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let sensors = [
            ("tracker_1", "left_forearm"),
            ("tracker_2", "left_upper_arm"),
            ("tracker_3", "right_forearm"),
            ("tracker_4", "right_upper_arm"),
        ]
        .into_iter()
        .map(|(s, g)| (s.to_string(), g.to_string()))
        .collect();

        Self {
            rig: RigConfig::default(),
            sensors,
            input: InputConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    pub anchors: Vec<AnchorConfig>,
    /// Parents before children.
    pub segments: Vec<SegmentConfig>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self::two_arm(0.5, 0.4, 0.35)
    }
}

impl RigConfig {
    /// Both arms held out sideways (T-pose along ±X), shoulders `shoulder_width` apart.
    pub fn two_arm(shoulder_width: f64, upper_arm_length: f64, forearm_length: f64) -> Self {
        let mut anchors = Vec::new();
        let mut segments = Vec::new();
        for (side, sign) in [("left", -1.0), ("right", 1.0)] {
            let shoulder = format!("{side}_shoulder");
            let upper = format!("{side}_upper_arm");
            anchors.push(AnchorConfig {
                name: shoulder.clone(),
                position: [sign * shoulder_width / 2.0, 0.0, 0.0],
            });
            segments.push(SegmentConfig {
                label: upper.clone(),
                attach: AttachConfig::Anchor(shoulder),
                direction: [sign, 0.0, 0.0],
                length: upper_arm_length,
                joint: format!("{side}_elbow"),
            });
            segments.push(SegmentConfig {
                label: format!("{side}_forearm"),
                attach: AttachConfig::Parent(upper),
                direction: [sign, 0.0, 0.0],
                length: forearm_length,
                joint: format!("{side}_wrist"),
            });
        }
        Self { anchors, segments }
    }

    /// Build and validate the skeleton
    pub fn to_skeleton(&self) -> Result<Skeleton> {
        let mut builder = Skeleton::builder();
        for anchor in &self.anchors {
            builder = builder.anchor(&anchor.name, Vec3::from(anchor.position));
        }
        for segment in &self.segments {
            let attach = match &segment.attach {
                AttachConfig::Anchor(name) => Attach::anchor(name),
                AttachConfig::Parent(label) => Attach::segment(label),
            };
            builder = builder.segment(
                &segment.label,
                attach,
                Vec3::from(segment.direction),
                segment.length,
                &segment.joint,
            );
        }
        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub name: String,
    /// Meters.
    pub position: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub label: String,
    pub attach: AttachConfig,
    /// Rest-pose direction, any length.
    pub direction: [f64; 3],
    /// Meters.
    pub length: f64,
    /// Name of the joint at the far end.
    pub joint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachConfig {
    /// Starts at a fixed anchor.
    Anchor(String),
    /// Starts at the end of another segment.
    Parent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// One CSV with a `<sensor>_WXYZ` column per sensor.
    #[default]
    Combined,
    /// One Movella DOT export per sensor, listed in `movella_files`.
    Movella,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub format: InputFormat,
    /// Component order of the quaternions in the input files.
    pub order: ComponentOrder,
    /// Sensor label to export path, for the Movella format.
    pub movella_files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Keep every n-th sample (1 keeps all).
    pub stride: usize,
    /// Frame (after decimation) used as the rest pose.
    pub calibration_frame: usize,
    /// Frames per second for paced playback.
    pub rate_hz: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            stride: 15,
            calibration_frame: 0,
            rate_hz: 10.0,
        }
    }
}

/// Load config from `path`, or return the default if the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    } else {
        log::info!("No config at {}, using defaults", path.display());
        Ok(AppConfig::default())
    }
}

/// Save config to `path`.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Saved config to {}", path.display());
    Ok(())
}
