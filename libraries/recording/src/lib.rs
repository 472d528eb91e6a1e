//! # Recording - captured orientation streams
//!
//! Loads sensor recordings from disk, lines the per-sensor streams up and
//! turns them into [`Frame`]s the kinematics core can resolve.
//!
//! Two on-disk formats are understood:
//!
//! - [`combined`]: one CSV with a `<sensor>_WXYZ` column per sensor, written
//!   by the recorder only when every sensor produced a sample
//! - [`movella`]: one per-device export with a free-form preamble and
//!   `Quat_W`..`Quat_Z` columns
//!
//! Streams from separate exports rarely have the same length; [`Recording::align`]
//! truncates them to the shortest before frames are built.

use std::collections::BTreeMap;
use std::path::Path;

use kinematics::{Frame, Quat};

pub mod combined;
pub mod error;
pub mod movella;

pub use combined::{read_combined, read_combined_path, CombinedWriter};
pub use error::{RecordingError, RecordingResult};
pub use movella::{read_movella, read_movella_path, MovellaExport};

/// Samples of one sensor, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub sensor: String,
    pub samples: Vec<Quat>,
}

/// A set of named sensor streams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    streams: Vec<Stream>,
    skipped_rows: usize,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream, replacing any previous stream for the same sensor
    pub fn push_stream(&mut self, sensor: impl Into<String>, samples: Vec<Quat>) {
        let sensor = sensor.into();
        match self.streams.iter_mut().find(|s| s.sensor == sensor) {
            Some(stream) => {
                log::warn!("Replacing stream for sensor {}", sensor);
                stream.samples = samples;
            }
            None => self.streams.push(Stream { sensor, samples }),
        }
    }

    /// Load one Movella export per sensor, keyed by sensor label.
    ///
    /// The streams are left as exported; call [`Recording::align`] before
    /// building frames.
    pub fn from_movella_paths<S, P>(files: impl IntoIterator<Item = (S, P)>) -> RecordingResult<Self>
    where
        S: Into<String>,
        P: AsRef<Path>,
    {
        let mut recording = Self::new();
        for (sensor, path) in files {
            let export = read_movella_path(path)?;
            recording.add_skipped(export.skipped_rows);
            recording.push_stream(sensor, export.samples);
        }
        if recording.streams.is_empty() {
            return Err(RecordingError::EmptyRecording);
        }
        Ok(recording)
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn stream(&self, sensor: &str) -> Option<&Stream> {
        self.streams.iter().find(|s| s.sensor == sensor)
    }

    /// Sensor labels in load order
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|s| s.sensor.as_str())
    }

    /// Number of complete frames: the length of the shortest stream
    pub fn frame_count(&self) -> usize {
        self.streams.iter().map(|s| s.samples.len()).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// True when every stream has the same length
    pub fn is_aligned(&self) -> bool {
        let count = self.frame_count();
        self.streams.iter().all(|s| s.samples.len() == count)
    }

    /// Rows dropped by the loader because a cell could not be parsed
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub(crate) fn add_skipped(&mut self, rows: usize) {
        self.skipped_rows += rows;
    }

    /// Truncate every stream to the shortest one. Returns the number of
    /// samples dropped across all streams.
    pub fn align(&mut self) -> usize {
        let count = self.frame_count();
        let mut dropped = 0;
        for stream in &mut self.streams {
            if stream.samples.len() > count {
                log::warn!(
                    "Stream {} has {} samples, truncating to {}",
                    stream.sensor,
                    stream.samples.len(),
                    count
                );
                dropped += stream.samples.len() - count;
                stream.samples.truncate(count);
            }
        }
        dropped
    }

    /// Keep every `stride`-th sample of every stream, starting with the first
    pub fn decimate(&mut self, stride: usize) -> RecordingResult<()> {
        if stride == 0 {
            return Err(RecordingError::InvalidStride { stride });
        }
        if stride == 1 {
            return Ok(());
        }
        for stream in &mut self.streams {
            stream.samples = stream.samples.iter().step_by(stride).copied().collect();
        }
        log::debug!("Decimated recording by {}", stride);
        Ok(())
    }

    /// Build one [`Frame`] per complete sample, keyed by segment label.
    ///
    /// `mapping` goes from sensor label to segment label. Sensors missing
    /// from the mapping are left out of the frames.
    pub fn frames(&self, mapping: &BTreeMap<String, String>) -> RecordingResult<Vec<Frame>> {
        let mut columns = Vec::with_capacity(mapping.len());
        for (sensor, segment) in mapping {
            let stream = self.stream(sensor).ok_or_else(|| RecordingError::UnknownSensor {
                sensor: sensor.clone(),
            })?;
            columns.push((segment.as_str(), &stream.samples));
        }
        for sensor in self.sensors().filter(|s| !mapping.contains_key(*s)) {
            log::debug!("Sensor {} is not mapped to a segment", sensor);
        }

        let count = columns.iter().map(|(_, samples)| samples.len()).min().unwrap_or(0);
        if count == 0 {
            return Err(RecordingError::EmptyRecording);
        }

        Ok((0..count)
            .map(|i| {
                columns
                    .iter()
                    .map(|(segment, samples)| (*segment, samples[i]))
                    .collect()
            })
            .collect())
    }
}
