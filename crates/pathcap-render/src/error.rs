//! Rendering error types.

use thiserror::Error;

/// Errors that can occur during capture rendering, readback, and export.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Requested target does not fit the device.
    #[error("capture target {width}x{height} exceeds device limit {max}")]
    TargetTooLarge { width: u32, height: u32, max: u32 },

    /// Target parameters are unusable.
    #[error("invalid capture target: {0}")]
    InvalidTarget(String),

    /// The target was destroyed or never fully created.
    #[error("capture target has been destroyed")]
    TargetDestroyed,

    /// Frame slot index out of range.
    #[error("frame slot {slot} out of range ({count} slots)")]
    InvalidFrameSlot { slot: usize, count: usize },

    /// No scene commands were recorded into the frame slot.
    #[error("frame slot {0} has no recorded scene commands")]
    SlotNotRecorded(usize),

    /// A fence was armed while a previous submission was still pending on it.
    #[error("fence armed while still pending")]
    FenceAlreadyArmed,

    /// A fence was waited on with no submission pending.
    #[error("fence waited on while not armed")]
    FenceNotArmed,

    /// The copy was submitted without a preceding render submission.
    #[error("copy submitted without a render-complete signal")]
    MissingRenderSignal,

    /// Waiting for the GPU failed for a reason other than a timeout.
    #[error("GPU wait failed: {0}")]
    Poll(#[from] wgpu::PollError),

    /// Mapping the readback buffer failed.
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),

    /// The readback row pitch cannot hold a packed row.
    #[error("row pitch {row_pitch} is smaller than packed row size {row_bytes}")]
    InvalidRowPitch { row_pitch: usize, row_bytes: usize },

    /// The readback data is shorter than its layout requires.
    #[error("readback buffer holds {actual} bytes, {expected} required")]
    ReadbackTooSmall { expected: usize, actual: usize },

    /// Output extension not handled by any codec.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Pixel data does not match the image dimensions.
    #[error("invalid image data")]
    InvalidImageData,

    /// Image encoding or file error.
    #[error("image encoding error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
