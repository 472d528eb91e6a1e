//! Per-device Movella DOT export.
//!
//! The exporter writes a few free-form lines (device tag, firmware, filter
//! profile) before the real CSV header, which is recognized by its
//! `SampleTimeFine` column.

use std::fs::File;
use std::io::{self, BufRead, Read};
use std::path::Path;

use kinematics::Quat;

use crate::error::{RecordingError, RecordingResult};

/// Marker column of the header line
pub const HEADER_MARKER: &str = "SampleTimeFine";

/// Quaternion columns, W first
pub const QUAT_COLUMNS: [&str; 4] = ["Quat_W", "Quat_X", "Quat_Y", "Quat_Z"];

/// Samples of a single device export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovellaExport {
    pub samples: Vec<Quat>,
    /// Rows dropped because a quaternion value was missing or not a number
    pub skipped_rows: usize,
}

/// Read an export from any buffered reader
pub fn read_movella<R: BufRead>(mut reader: R) -> RecordingResult<MovellaExport> {
    let mut line = String::new();
    let mut preamble = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(RecordingError::MissingHeader {
                marker: HEADER_MARKER.to_string(),
            });
        }
        if line.contains(HEADER_MARKER) {
            break;
        }
        preamble += 1;
    }
    log::debug!("Skipped {} preamble lines", preamble);

    // feed the header line back in front of the data
    let body = io::Cursor::new(line.into_bytes()).chain(reader);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers = rdr.headers()?.clone();
    let mut indices = [0usize; 4];
    for (idx, column) in indices.iter_mut().zip(QUAT_COLUMNS) {
        *idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| RecordingError::MissingColumn {
                column: column.to_string(),
            })?;
    }

    let mut export = MovellaExport::default();
    for record in rdr.records() {
        let record = record?;
        let mut components = [0.0; 4];
        let complete = indices.iter().zip(components.iter_mut()).all(|(idx, slot)| {
            match record.get(*idx).map(str::parse::<f64>) {
                Some(Ok(value)) => {
                    *slot = value;
                    true
                }
                _ => false,
            }
        });
        if complete {
            export.samples.push(Quat::from_wxyz(components));
        } else {
            export.skipped_rows += 1;
        }
    }

    if export.skipped_rows > 0 {
        log::warn!("Skipped {} incomplete rows", export.skipped_rows);
    }
    Ok(export)
}

/// Read an export from a file
pub fn read_movella_path(path: impl AsRef<Path>) -> RecordingResult<MovellaExport> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let export = read_movella(io::BufReader::new(file))?;
    log::info!("Loaded {} samples from {}", export.samples.len(), path.display());
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
DeviceTag: 0
Firmware Version: 2.6.0
Filter Profile: General
PacketCounter,SampleTimeFine,Quat_W,Quat_X,Quat_Y,Quat_Z
0,1000,1.000000,0.000000,0.000000,0.000000
1,1017,0.707107,0.000000,0.000000,0.707107
2,1034,,0.1,0.2,0.3
";

    #[test]
    fn test_read_export_after_preamble() {
        let export = read_movella(EXPORT.as_bytes()).unwrap();
        assert_eq!(export.samples.len(), 2);
        assert_eq!(export.samples[0], Quat::identity());
        assert_eq!(
            export.samples[1],
            Quat::from_wxyz([0.707107, 0.0, 0.0, 0.707107])
        );
        assert_eq!(export.skipped_rows, 1);
    }

    #[test]
    fn test_header_without_preamble() {
        let input = "SampleTimeFine,Quat_Z,Quat_Y,Quat_X,Quat_W\n5,0.4,0.3,0.2,0.1\n";
        let export = read_movella(input.as_bytes()).unwrap();
        assert_eq!(export.samples, vec![Quat::from_wxyz([0.1, 0.2, 0.3, 0.4])]);
    }

    #[test]
    fn test_missing_header_line() {
        let err = read_movella("DeviceTag: 0\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RecordingError::MissingHeader { marker } if marker == HEADER_MARKER));
    }

    #[test]
    fn test_missing_quaternion_column() {
        let input = "SampleTimeFine,Quat_W,Quat_X,Quat_Y\n1,1,0,0\n";
        let err = read_movella(input.as_bytes()).unwrap_err();
        assert!(matches!(err, RecordingError::MissingColumn { column } if column == "Quat_Z"));
    }
}
