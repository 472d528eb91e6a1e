use thiserror::Error;

/// Errors raised while loading, reshaping or writing recordings
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No header row, or no line carrying the expected marker
    #[error("Missing header: no line containing `{marker}`")]
    MissingHeader {
        /// Text the header line must contain
        marker: String,
    },

    /// The header exists but lacks a required column
    #[error("Missing column: {column}")]
    MissingColumn {
        /// Name of the column
        column: String,
    },

    /// The sensor-to-segment mapping names a sensor the recording does not have
    #[error("Unknown sensor in mapping: {sensor}")]
    UnknownSensor {
        /// Sensor label from the mapping
        sensor: String,
    },

    /// Decimation stride must be at least 1
    #[error("Invalid stride: {stride}")]
    InvalidStride { stride: usize },

    /// There is no complete frame to work with
    #[error("Empty recording")]
    EmptyRecording,
}

/// Type alias for Result with RecordingError
pub type RecordingResult<T> = Result<T, RecordingError>;
