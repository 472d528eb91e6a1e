//! Combined multi-sensor CSV.
//!
//! ```text
//! tracker_1_WXYZ,tracker_2_WXYZ
//! "0.7071,0.0000,0.0000,0.7071","1.0000,0.0000,0.0000,0.0000"
//! ```
//!
//! Each cell holds one W-first quaternion. A row is written only when every
//! sensor delivered a sample, so every row read back is a synchronized frame.

use std::fs::File;
use std::io;
use std::path::Path;

use kinematics::Quat;

use crate::error::{RecordingError, RecordingResult};
use crate::Recording;

/// Column suffix identifying a quaternion column
pub const COLUMN_SUFFIX: &str = "_WXYZ";

/// Read a combined recording from any reader.
///
/// Rows with a cell that does not hold exactly four numbers are skipped,
/// logged and counted in [`Recording::skipped_rows`].
pub fn read_combined<R: io::Read>(reader: R) -> RecordingResult<Recording> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(RecordingError::MissingHeader {
            marker: COLUMN_SUFFIX.to_string(),
        });
    }

    let columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| name.strip_suffix(COLUMN_SUFFIX).map(|sensor| (idx, sensor)))
        .collect();
    if columns.is_empty() {
        return Err(RecordingError::MissingColumn {
            column: format!("<sensor>{}", COLUMN_SUFFIX),
        });
    }
    for name in headers.iter().filter(|h| !h.ends_with(COLUMN_SUFFIX)) {
        log::debug!("Ignoring column {}", name);
    }

    let mut samples: Vec<Vec<Quat>> = vec![Vec::new(); columns.len()];
    let mut skipped = 0;
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let parsed: Option<Vec<Quat>> = columns
            .iter()
            .map(|(idx, _)| record.get(*idx).and_then(parse_cell))
            .collect();
        match parsed {
            Some(row_samples) => {
                for (stream, sample) in samples.iter_mut().zip(row_samples) {
                    stream.push(sample);
                }
            }
            None => {
                // header is line 1
                log::warn!("Skipping malformed row at line {}", row + 2);
                skipped += 1;
            }
        }
    }

    let mut recording = Recording::new();
    for ((_, sensor), stream) in columns.into_iter().zip(samples) {
        recording.push_stream(sensor, stream);
    }
    recording.add_skipped(skipped);
    log::info!(
        "Loaded {} frames from {} sensors ({} rows skipped)",
        recording.frame_count(),
        recording.streams().len(),
        skipped
    );
    Ok(recording)
}

/// Read a combined recording from a file
pub fn read_combined_path(path: impl AsRef<Path>) -> RecordingResult<Recording> {
    let file = File::open(path.as_ref())?;
    log::debug!("Reading combined recording {}", path.as_ref().display());
    read_combined(io::BufReader::new(file))
}

/// Parse a `"w,x,y,z"` cell.
///
/// Characters that cannot be part of a number or separator are dropped
/// first, so brackets or stray quotes around the values are tolerated.
fn parse_cell(cell: &str) -> Option<Quat> {
    let cleaned: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | 'e' | 'E'))
        .collect();

    let mut components = [0.0; 4];
    let mut parts = cleaned.split(',');
    for slot in components.iter_mut() {
        *slot = parts.next()?.parse::<f64>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Quat::from_wxyz(components))
}

/// Streaming writer for the combined format
pub struct CombinedWriter<W: io::Write> {
    writer: csv::Writer<W>,
    sensors: Vec<String>,
    rows: usize,
}

impl CombinedWriter<File> {
    /// Create (or truncate) `path` and write the header
    pub fn create(path: impl AsRef<Path>, sensors: Vec<String>) -> RecordingResult<Self> {
        Self::new(File::create(path)?, sensors)
    }
}

impl<W: io::Write> CombinedWriter<W> {
    /// Wrap `writer` and write the header row for `sensors`
    pub fn new(writer: W, sensors: Vec<String>) -> RecordingResult<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(sensors.iter().map(|s| format!("{}{}", s, COLUMN_SUFFIX)))?;
        Ok(Self {
            writer,
            sensors,
            rows: 0,
        })
    }

    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Rows written so far, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write one row if every sensor has a sample.
    ///
    /// `samples` is in [`CombinedWriter::sensors`] order. Returns `false`
    /// and writes nothing when a sample is missing or the count is wrong.
    pub fn write_sample(&mut self, samples: &[Option<Quat>]) -> RecordingResult<bool> {
        if samples.len() != self.sensors.len() {
            log::warn!(
                "Sample has {} entries for {} sensors, dropped",
                samples.len(),
                self.sensors.len()
            );
            return Ok(false);
        }
        let Some(complete) = samples.iter().copied().collect::<Option<Vec<Quat>>>() else {
            return Ok(false);
        };

        self.writer.write_record(complete.iter().map(format_cell))?;
        self.rows += 1;
        Ok(true)
    }

    /// Write every frame of `recording`, aligned to its shortest stream
    pub fn write_recording(&mut self, recording: &Recording) -> RecordingResult<()> {
        let streams = self
            .sensors
            .iter()
            .map(|sensor| {
                recording
                    .stream(sensor)
                    .map(|s| &s.samples)
                    .ok_or_else(|| RecordingError::UnknownSensor {
                        sensor: sensor.clone(),
                    })
            })
            .collect::<RecordingResult<Vec<_>>>()?;

        for i in 0..recording.frame_count() {
            let row: Vec<Option<Quat>> = streams.iter().map(|s| s.get(i).copied()).collect();
            self.write_sample(&row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> RecordingResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the inner writer
    pub fn into_inner(self) -> RecordingResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| RecordingError::Io(e.into_error()))
    }
}

fn format_cell(q: &Quat) -> String {
    let [w, x, y, z] = q.to_wxyz();
    format!("{:.4},{:.4},{:.4},{:.4}", w, x, y, z)
}
