//! pathcap: render a scene along a camera path and export float feature images.
//!
//! A run loads a [`CaptureConfig`], interpolates the camera path into one pose
//! per frame, and sweeps every configured feature channel over the frame
//! interval. Each frame is rendered offscreen, read back once the GPU has
//! finished with it, and written as a 32-bit float image.
//!
//! # Example
//! ```no_run
//! use pathcap::*;
//!
//! fn main() -> Result<()> {
//!     let config = CaptureConfig::load("capture.json")?;
//!     let summary = run(&config)?;
//!     println!("wrote {} frames", summary.frames_written);
//!     Ok(())
//! }
//! ```

mod session;

pub use pathcap_core::{
    CameraCheckpoint, CameraPath, CaptureConfig, CaptureError, Extrapolation, FeatureChannel,
    FeatureSweepController, FeatureSweepState, FrameCapture, FrameInterval, InterpolatedPose,
    OutputNaming, Result, SweepStep, Vec3,
};
pub use pathcap_render::{
    Camera, DebugScene, FrameSubmissionPipeline, GpuContext, OffscreenCaptureTarget, RenderError,
    SceneRecorder, TargetDescriptor,
};
pub use session::{CaptureSession, SweepSummary};

use pollster::FutureExt;

/// Runs a whole capture with the built-in debug scene.
///
/// The configuration is validated and the path loaded before any GPU work.
/// With path following disabled nothing is rendered.
pub fn run(config: &CaptureConfig) -> Result<SweepSummary> {
    config.validate()?;
    let Some(mut controller) = prepare_sweep(config)? else {
        return Ok(SweepSummary::default());
    };

    let gpu = GpuContext::new_headless()
        .block_on()
        .map_err(|e| CaptureError::Render(format!("Failed to create headless GPU context: {e}")))?;
    let mut session = CaptureSession::with_debug_scene(gpu, config)?;
    let summary = session.run_sweep(&mut controller)?;
    session.destroy();
    Ok(summary)
}

/// Loads the camera path and builds the sweep controller.
///
/// Returns `None` when path following is disabled.
pub fn prepare_sweep(config: &CaptureConfig) -> Result<Option<FeatureSweepController>> {
    if !config.follow_path {
        log::info!("Path following disabled, nothing to capture");
        return Ok(None);
    }
    let path_file = config
        .path_file
        .as_ref()
        .ok_or_else(|| CaptureError::Config("follow_path is enabled but no path_file is set".into()))?;
    let path = CameraPath::load(path_file)?;
    FeatureSweepController::from_config(config, &path).map(Some)
}
