//! Capture session: wires the sweep, camera, scene and GPU pipeline together.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pathcap_core::{
    CaptureConfig, CaptureError, FeatureSweepController, FrameCapture, Result, SweepStep,
};
use pathcap_render::{
    export_frame, Camera, DebugScene, FrameSubmissionPipeline, GpuContext,
    OffscreenCaptureTarget, RenderError, SceneRecorder, TargetDescriptor,
};

/// What a finished sweep produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Number of images written.
    pub frames_written: usize,
    /// Number of feature channels whose interval completed.
    pub features_completed: usize,
    /// Written files, in capture order.
    pub files: Vec<PathBuf>,
}

fn render_error(context: &str) -> impl Fn(RenderError) -> CaptureError + '_ {
    move |e| CaptureError::Render(format!("{context}: {e}"))
}

/// GPU resources and camera state for one capture run.
pub struct CaptureSession {
    gpu: GpuContext,
    target: OffscreenCaptureTarget,
    pipeline: FrameSubmissionPipeline,
    scene: Box<dyn SceneRecorder>,
    camera: Camera,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Creates the capture target and records every frame slot from `scene`.
    pub fn new(
        gpu: GpuContext,
        config: &CaptureConfig,
        scene: Box<dyn SceneRecorder>,
    ) -> Result<Self> {
        config.validate()?;
        let desc = TargetDescriptor::new(config.width, config.height, config.frame_slots);
        let mut target = OffscreenCaptureTarget::create(&gpu, desc)
            .map_err(render_error("Failed to create capture target"))?;
        target
            .record_all_slots(&gpu.device, scene.as_ref())
            .map_err(render_error("Failed to record frame slots"))?;

        let pipeline = FrameSubmissionPipeline::new(
            Duration::from_nanos(config.render_wait_timeout_ns),
            Duration::from_nanos(config.copy_wait_timeout_ns),
        );

        let mut session = Self {
            gpu,
            target,
            pipeline,
            scene,
            camera: Camera::new(config.aspect_ratio()),
            config: config.clone(),
        };
        session.reset_projection();
        Ok(session)
    }

    /// Creates a session rendering the built-in debug scene.
    pub fn with_debug_scene(gpu: GpuContext, config: &CaptureConfig) -> Result<Self> {
        let desc = TargetDescriptor::new(config.width, config.height, config.frame_slots);
        let scene = DebugScene::new(
            &gpu.device,
            desc.color_format,
            desc.depth_format,
            desc.frame_slots,
        );
        Self::new(gpu, config, Box::new(scene))
    }

    /// The capture camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The capture target.
    pub fn target(&self) -> &OffscreenCaptureTarget {
        &self.target
    }

    /// Drives `controller` to completion, capturing and exporting every frame.
    pub fn run_sweep(&mut self, controller: &mut FeatureSweepController) -> Result<SweepSummary> {
        let started = Instant::now();
        let mut summary = SweepSummary::default();
        log::info!(
            "Capturing {} frames at {}x{}",
            controller.total_frames(),
            self.config.width,
            self.config.height
        );

        loop {
            match controller.step() {
                SweepStep::Capture(capture) => {
                    let file = self.capture(&capture)?;
                    summary.files.push(file);
                    summary.frames_written += 1;
                }
                SweepStep::AdvanceFeature { next, .. } => {
                    log::debug!("Starting feature {next}");
                }
                SweepStep::Done => break,
            }
        }

        summary.features_completed = controller.state().current_feature;
        log::info!(
            "Wrote {} frames in {:.2?}",
            summary.frames_written,
            started.elapsed()
        );
        Ok(summary)
    }

    /// Renders, reads back and exports a single frame.
    pub fn capture(&mut self, capture: &FrameCapture) -> Result<PathBuf> {
        let slot = self.pipeline.next_slot(self.target.frame_slot_count());
        self.camera.apply_pose(&capture.pose);
        self.scene
            .update(&self.gpu.queue, slot, &self.camera, capture.channel);

        let frame = self
            .pipeline
            .capture_frame(&self.gpu.device, &self.gpu.queue, &mut self.target, slot)
            .map_err(render_error("Frame capture failed"))?;

        let file = PathBuf::from(&capture.file_name);
        export_frame(&frame, &file).map_err(|e| {
            CaptureError::Render(format!("Failed to write {}: {e}", file.display()))
        })?;

        self.reset_projection();
        Ok(file)
    }

    /// Restores the configured perspective after a capture.
    fn reset_projection(&mut self) {
        self.camera.set_perspective(
            self.config.fov_degrees,
            self.config.aspect_ratio(),
            self.config.near,
            self.config.far,
        );
    }

    /// Releases the capture target. The session cannot capture afterwards.
    pub fn destroy(&mut self) {
        self.target.destroy();
    }
}
