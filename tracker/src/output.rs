use std::io::Write;

use anyhow::Result;
use kinematics::Pose;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `frame,joint,x,y,z`, one row per joint
    #[default]
    Csv,
    /// One JSON object per frame, one frame per line
    Json,
}

#[derive(Serialize)]
struct JointRow<'a> {
    frame: u64,
    joint: &'a str,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    #[serde(flatten)]
    pose: &'a Pose,
}

enum Sink<W: Write> {
    Csv(csv::Writer<W>),
    Json(W),
}

/// Streams resolved poses to a writer
pub struct PoseWriter<W: Write> {
    sink: Sink<W>,
    frames: usize,
}

impl<W: Write> PoseWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        let sink = match format {
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
            OutputFormat::Json => Sink::Json(writer),
        };
        Self { sink, frames: 0 }
    }

    pub fn write(&mut self, frame: u64, pose: &Pose) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => {
                for joint in &pose.joints {
                    writer.serialize(JointRow {
                        frame,
                        joint: &joint.joint,
                        x: joint.position.x,
                        y: joint.position.y,
                        z: joint.position.z,
                    })?;
                }
            }
            Sink::Json(writer) => {
                serde_json::to_writer(&mut *writer, &FrameRecord { frame, pose })?;
                writer.write_all(b"\n")?;
            }
        }
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn flush(&mut self) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => writer.flush()?,
            Sink::Json(writer) => writer.flush()?,
        }
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        match self.sink {
            Sink::Csv(writer) => writer.into_inner().map_err(|e| e.into_error().into()),
            Sink::Json(mut writer) => {
                writer.flush()?;
                Ok(writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics::{JointPosition, Vec3};

    fn pose() -> Pose {
        Pose {
            joints: vec![
                JointPosition {
                    joint: "shoulder".into(),
                    position: Vec3::zeros(),
                },
                JointPosition {
                    joint: "elbow".into(),
                    position: Vec3::new(0.4, 0.0, 0.0),
                },
            ],
            segments: Vec::new(),
            degenerate: Vec::new(),
        }
    }

    #[test]
    fn test_csv_rows_per_joint() {
        let mut writer = PoseWriter::new(Vec::new(), OutputFormat::Csv);
        writer.write(7, &pose()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(text, "frame,joint,x,y,z\n7,shoulder,0.0,0.0,0.0\n7,elbow,0.4,0.0,0.0\n");
    }

    #[test]
    fn test_json_line_per_frame() {
        let mut writer = PoseWriter::new(Vec::new(), OutputFormat::Json);
        writer.write(1, &pose()).unwrap();
        writer.write(2, &pose()).unwrap();
        assert_eq!(writer.frames(), 2);
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["frame"], 2);
        assert_eq!(lines[0]["joints"][1]["joint"], "elbow");
        assert_eq!(lines[0]["joints"][1]["position"][0], 0.4);
    }
}
