//! Per-frame submission and readback.
//!
//! Every capture runs four phases in order: submit the frame slot's render,
//! record the copy into the readback buffer, submit the copy behind the
//! render, then wait on the host and map the buffer. Nothing overlaps with
//! the next frame, so a read never observes a partially written image.

use std::time::{Duration, Instant};

use crate::error::{RenderError, RenderResult};
use crate::target::{OffscreenCaptureTarget, ReadbackLayout};

/// Per-attempt timeout of the wait for render completion.
pub const DEFAULT_RENDER_WAIT_TIMEOUT: Duration = Duration::from_nanos(10_000_000);
/// Per-attempt timeout of the wait for copy completion.
pub const DEFAULT_COPY_WAIT_TIMEOUT: Duration = Duration::from_nanos(10_000);

/// Readback bytes of one captured frame, still in device layout.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Mapped bytes starting at `layout.offset`.
    pub bytes: Vec<u8>,
    /// Row pitch and size the bytes follow.
    pub layout: ReadbackLayout,
    pub width: u32,
    pub height: u32,
    /// Frame slot that produced the image.
    pub slot: usize,
}

/// Drives the render, copy and readback of captured frames.
#[derive(Debug, Clone)]
pub struct FrameSubmissionPipeline {
    render_wait_timeout: Duration,
    copy_wait_timeout: Duration,
    frames_captured: u64,
}

impl Default for FrameSubmissionPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_WAIT_TIMEOUT, DEFAULT_COPY_WAIT_TIMEOUT)
    }
}

impl FrameSubmissionPipeline {
    /// Creates a pipeline with the given per-attempt wait timeouts.
    #[must_use]
    pub fn new(render_wait_timeout: Duration, copy_wait_timeout: Duration) -> Self {
        Self {
            render_wait_timeout,
            copy_wait_timeout,
            frames_captured: 0,
        }
    }

    /// Number of frames read back so far.
    #[must_use]
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    /// Slot the next frame should render from, cycling through all slots.
    #[must_use]
    pub fn next_slot(&self, slot_count: usize) -> usize {
        if slot_count == 0 {
            return 0;
        }
        (self.frames_captured % slot_count as u64) as usize
    }

    /// Captures the next frame, choosing the slot round-robin.
    pub fn capture_next(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &mut OffscreenCaptureTarget,
    ) -> RenderResult<RawFrame> {
        let slot = self.next_slot(target.frame_slot_count());
        self.capture_frame(device, queue, target, slot)
    }

    /// Renders frame slot `slot` and reads the color attachment back.
    ///
    /// Blocks until the copy has completed. Wait timeouts are retried; only
    /// hard submission, wait or mapping failures are returned.
    pub fn capture_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &mut OffscreenCaptureTarget,
        slot: usize,
    ) -> RenderResult<RawFrame> {
        let started = Instant::now();
        let (width, height) = target.dimensions();

        // 1. Submit render, signaling render-complete.
        let render_index = {
            let bundle = target.slot(slot)?;
            let framebuffer = target.framebuffer()?;
            let pass = target.pass()?;
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture render encoder"),
            });
            {
                let mut render_pass = pass.begin(&mut encoder, framebuffer);
                render_pass.execute_bundles(std::iter::once(bundle));
            }
            queue.submit(std::iter::once(encoder.finish()))
        };
        target.fence_mut()?.arm(render_index.clone())?;
        target.render_complete_mut()?.signal(render_index);

        // 2. Record the copy, fresh every frame.
        let layout = target.readback_layout()?;
        let copy_commands = {
            let color = target.color()?;
            let readback = target.readback()?;
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture copy encoder"),
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &color.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &readback.buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: layout.offset,
                        bytes_per_row: Some(layout.row_pitch),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            encoder.finish()
        };

        // 3. Wait for the render, then submit the copy behind it.
        let render_retries = {
            let fence = target.fence_mut()?;
            let retries = fence.wait(device, self.render_wait_timeout)?;
            fence.reset();
            retries
        };
        let rendered = target.render_complete_mut()?.consume()?;
        log::trace!("copy for slot {slot} ordered after {rendered:?}");
        let copy_index = queue.submit(std::iter::once(copy_commands));
        target.fence_mut()?.arm(copy_index)?;

        // 4. Wait for the copy, then map and read.
        let copy_retries = {
            let fence = target.fence_mut()?;
            let retries = fence.wait(device, self.copy_wait_timeout)?;
            fence.reset();
            retries
        };
        let bytes = read_mapped(device, &target.readback()?.buffer, layout)?;

        self.frames_captured += 1;
        log::debug!(
            "Captured frame {} from slot {slot} in {:?} (render wait retries {render_retries}, copy wait retries {copy_retries})",
            self.frames_captured,
            started.elapsed()
        );

        Ok(RawFrame {
            bytes,
            layout,
            width,
            height,
            slot,
        })
    }
}

/// Maps the readback range, copies it out and unmaps.
fn read_mapped(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
    layout: ReadbackLayout,
) -> RenderResult<Vec<u8>> {
    let slice = buffer.slice(layout.offset..layout.offset + layout.size);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.recv()
        .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?
        .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?;

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(bytes)
}
