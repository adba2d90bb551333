//! Rendering backend for pathcap.
//!
//! This crate provides the wgpu side of a capture:
//! - Headless device bootstrap
//! - The offscreen capture target and its readback buffer
//! - The frame submission protocol and host synchronization
//! - Float image export
//! - A built-in debug scene that records frame slots

pub mod camera;
pub mod context;
pub mod error;
pub mod export;
pub mod scene;
pub mod submit;
pub mod sync;
pub mod target;

pub use camera::Camera;
pub use context::{supports_capture_formats, GpuContext};
pub use error::{RenderError, RenderResult};
pub use export::{convert, export_frame, write};
pub use scene::{BoxMesh, DebugScene, SceneRecorder, SceneUniforms, Vertex};
pub use submit::{
    FrameSubmissionPipeline, RawFrame, DEFAULT_COPY_WAIT_TIMEOUT, DEFAULT_RENDER_WAIT_TIMEOUT,
};
pub use sync::{wait_with_retry, CaptureFence, RenderCompleteSignal};
pub use target::{
    Attachment, CapturePass, Framebuffer, OffscreenCaptureTarget, ReadbackImage, ReadbackLayout,
    TargetDescriptor, DEFAULT_COLOR_FORMAT, DEFAULT_DEPTH_FORMAT,
};
