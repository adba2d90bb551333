//! Core logic for pathcap.
//!
//! This crate holds everything that does not touch the GPU:
//! - [`CameraPath`] loading and per-frame pose interpolation
//! - [`FeatureSweepController`] iterating feature channels x frame interval
//! - [`CaptureConfig`] and output file naming
//! - The [`CaptureError`] type shared by the workspace

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod feature;
pub mod naming;
pub mod path;
pub mod sweep;

pub use config::{CaptureConfig, FrameInterval};
pub use error::{CaptureError, Result};
pub use feature::FeatureChannel;
pub use naming::OutputNaming;
pub use path::{CameraCheckpoint, CameraPath, Extrapolation, InterpolatedPose, PathPlanner};
pub use sweep::{FeatureSweepController, FeatureSweepState, FrameCapture, SweepStep};

// Re-export glam types for convenience
pub use glam::{Mat3, Mat4, Vec3};
