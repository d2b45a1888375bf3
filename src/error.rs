//! Error types.
//!
//! Only startup can fail: opening the telemetry source, loading the gauge
//! images, or building the acquisition runtime. Once the panel is running,
//! failed reads are "no reading" values rather than errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from opening a telemetry source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("No serial adapter found")]
    NoAdapter,

    #[error("Adapter did not answer '{command}'")]
    NoResponse { command: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading the gauge image set.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Top-level startup errors.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Telemetry source: {0}")]
    Source(#[from] SourceError),

    #[error("Assets: {0}")]
    Asset(#[from] AssetError),

    #[error("Acquisition runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
