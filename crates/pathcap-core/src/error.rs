//! Error types for pathcap.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for pathcap operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The camera path file could not be opened or read.
    #[error("could not open path file {path}: {source}")]
    PathFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The camera path file is not valid JSON or a checkpoint is malformed.
    #[error("path file parse error: {0}")]
    PathFileParse(#[source] serde_json::Error),

    /// The top-level JSON value of the path file is not a list.
    #[error("path file top-level value is not a list")]
    PathNotAList,

    /// The path file contains no checkpoints.
    #[error("path file contains no checkpoints")]
    EmptyPath,

    /// A path needs at least two checkpoints to interpolate between.
    #[error("camera path needs at least 2 checkpoints, got {0}")]
    TooFewCheckpoints(usize),

    /// Checkpoint frame indices must be strictly increasing.
    #[error("checkpoint {index} has frame index {current}, not greater than previous {previous}")]
    NonIncreasingFrameIndex {
        index: usize,
        previous: i64,
        current: i64,
    },

    /// The configured frame interval does not fit the path.
    #[error("frame interval [{start}, {end}) is invalid for a path of {len} frames")]
    InvalidInterval { start: usize, end: usize, len: usize },

    /// Invalid capture configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for pathcap operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
