//! Offscreen capture target.
//!
//! Owns every GPU object the capture path touches: the color and depth
//! attachments, the framebuffer pairing them, the clear-then-store capture
//! pass, the frame slots holding pre-recorded scene commands, the host-mapped
//! readback buffer, and the synchronization objects. None of these are shared
//! with any presentation path.

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::scene::SceneRecorder;
use crate::sync::{CaptureFence, RenderCompleteSignal};

/// Default color format of captured frames.
pub const DEFAULT_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Default depth format.
pub const DEFAULT_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Parameters of an [`OffscreenCaptureTarget`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color attachment and readback format.
    pub color_format: wgpu::TextureFormat,
    /// Depth attachment format.
    pub depth_format: wgpu::TextureFormat,
    /// Number of frame slots.
    pub frame_slots: usize,
    /// Color the capture pass clears to.
    pub clear_color: wgpu::Color,
}

impl TargetDescriptor {
    /// Descriptor with the default float color and depth formats.
    #[must_use]
    pub fn new(width: u32, height: u32, frame_slots: usize) -> Self {
        Self {
            width,
            height,
            color_format: DEFAULT_COLOR_FORMAT,
            depth_format: DEFAULT_DEPTH_FORMAT,
            frame_slots,
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Checks the parameters that need no device.
    ///
    /// The color format must be [`DEFAULT_COLOR_FORMAT`], the layout
    /// [`crate::convert`] reads back.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidTarget(format!(
                "size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.frame_slots == 0 {
            return Err(RenderError::InvalidTarget(
                "at least one frame slot is required".into(),
            ));
        }
        if self.color_format != DEFAULT_COLOR_FORMAT {
            return Err(RenderError::InvalidTarget(format!(
                "color format {:?} is not supported, captures use {DEFAULT_COLOR_FORMAT:?}",
                self.color_format
            )));
        }
        if !self.depth_format.has_depth_aspect() {
            return Err(RenderError::InvalidTarget(format!(
                "{:?} is not a depth format",
                self.depth_format
            )));
        }
        Ok(())
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Byte layout of the readback buffer as the device requires it.
///
/// Rows are `row_pitch` bytes apart, which is at least and usually more than
/// the packed row size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadbackLayout {
    /// Offset of the first row.
    pub offset: u64,
    /// Byte stride between rows.
    pub row_pitch: u32,
    /// Bytes from `offset` to the end of the last row's pitch.
    pub size: u64,
}

impl ReadbackLayout {
    /// Computes the layout for an image, padding rows to `row_alignment`.
    #[must_use]
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32, row_alignment: u32) -> Self {
        let row_pitch = (width * bytes_per_pixel).div_ceil(row_alignment) * row_alignment;
        Self {
            offset: 0,
            row_pitch,
            size: u64::from(row_pitch) * u64::from(height),
        }
    }

    /// Layout of a copy from `format` on the current device.
    pub fn for_format(format: wgpu::TextureFormat, width: u32, height: u32) -> RenderResult<Self> {
        let bytes_per_pixel = format
            .block_copy_size(Some(wgpu::TextureAspect::All))
            .ok_or_else(|| {
                RenderError::InvalidTarget(format!("format {format:?} cannot be copied to a buffer"))
            })?;
        Ok(Self::new(
            width,
            height,
            bytes_per_pixel,
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        ))
    }
}

/// A texture and its default view.
#[derive(Debug)]
pub struct Attachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// The pair of views the capture pass renders into.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
}

/// The single-subpass capture pass: clear then store both attachments.
///
/// wgpu's resource tracking orders the pass against preceding and following
/// GPU work on the same attachments.
#[derive(Debug, Clone, Copy)]
pub struct CapturePass {
    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
}

impl CapturePass {
    /// Begins the pass on `framebuffer`.
    pub fn begin<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        framebuffer: &Framebuffer,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("capture pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &framebuffer.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &framebuffer.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        })
    }
}

/// Host-mapped mirror of the color attachment.
#[derive(Debug)]
pub struct ReadbackImage {
    pub buffer: wgpu::Buffer,
    pub layout: ReadbackLayout,
}

/// Dedicated render destination plus host-readable mirror.
///
/// Every field is optional so [`OffscreenCaptureTarget::destroy`] can run on a
/// partially built or already destroyed target.
#[derive(Debug)]
pub struct OffscreenCaptureTarget {
    desc: TargetDescriptor,
    color: Option<Attachment>,
    depth: Option<Attachment>,
    framebuffer: Option<Framebuffer>,
    pass: Option<CapturePass>,
    slots: Vec<Option<wgpu::RenderBundle>>,
    readback: Option<ReadbackImage>,
    fence: Option<CaptureFence>,
    render_complete: Option<RenderCompleteSignal>,
}

impl OffscreenCaptureTarget {
    /// Allocates attachments, framebuffer, pass, frame slots, sync objects and
    /// the readback buffer.
    ///
    /// Fails with [`RenderError::InvalidTarget`] when the adapter cannot render
    /// and copy the requested formats.
    pub fn create(gpu: &GpuContext, desc: TargetDescriptor) -> RenderResult<Self> {
        desc.validate()?;
        let device = &gpu.device;
        let max = device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(RenderError::TargetTooLarge {
                width: desc.width,
                height: desc.height,
                max,
            });
        }
        if !gpu.supports_capture_formats(desc.color_format, desc.depth_format) {
            return Err(RenderError::InvalidTarget(format!(
                "adapter {} cannot render {:?} with {:?} depth",
                gpu.adapter_info.name, desc.color_format, desc.depth_format
            )));
        }
        let layout = ReadbackLayout::for_format(desc.color_format, desc.width, desc.height)?;

        let mut target = Self::empty(desc);

        let color = Self::create_attachment(
            device,
            "capture color attachment",
            &desc,
            desc.color_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let depth = Self::create_attachment(
            device,
            "capture depth attachment",
            &desc,
            desc.depth_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        target.framebuffer = Some(Framebuffer {
            color: color.view.clone(),
            depth: depth.view.clone(),
        });
        target.color = Some(color);
        target.depth = Some(depth);
        target.pass = Some(CapturePass {
            clear_color: desc.clear_color,
            clear_depth: 1.0,
        });
        target.slots = (0..desc.frame_slots).map(|_| None).collect();
        target.fence = Some(CaptureFence::new());
        target.render_complete = Some(RenderCompleteSignal::new());

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture readback buffer"),
            size: layout.offset + layout.size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        // The allocation may be rounded up; what the device reports is authoritative.
        let layout = ReadbackLayout {
            size: buffer.size() - layout.offset,
            ..layout
        };
        target.readback = Some(ReadbackImage { buffer, layout });

        log::info!(
            "Created capture target {}x{} {:?}/{:?}, {} frame slots, row pitch {} bytes ({} packed)",
            desc.width,
            desc.height,
            desc.color_format,
            desc.depth_format,
            desc.frame_slots,
            layout.row_pitch,
            desc.width
                * desc
                    .color_format
                    .block_copy_size(Some(wgpu::TextureAspect::All))
                    .unwrap_or(0)
        );

        Ok(target)
    }

    fn empty(desc: TargetDescriptor) -> Self {
        Self {
            desc,
            color: None,
            depth: None,
            framebuffer: None,
            pass: None,
            slots: Vec::new(),
            readback: None,
            fence: None,
            render_complete: None,
        }
    }

    fn create_attachment(
        device: &wgpu::Device,
        label: &str,
        desc: &TargetDescriptor,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Attachment {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: desc.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Attachment { texture, view }
    }

    /// Releases every owned GPU object. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        let live = self.is_live();

        self.framebuffer = None;
        self.pass = None;
        self.slots.clear();
        self.fence = None;
        self.render_complete = None;
        if let Some(readback) = self.readback.take() {
            readback.buffer.destroy();
        }
        if let Some(color) = self.color.take() {
            color.texture.destroy();
        }
        if let Some(depth) = self.depth.take() {
            depth.texture.destroy();
        }

        if live {
            log::info!(
                "Destroyed capture target {}x{}",
                self.desc.width,
                self.desc.height
            );
        }
    }

    /// Whether any GPU object is still owned.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.color.is_some()
            || self.depth.is_some()
            || self.readback.is_some()
            || self.framebuffer.is_some()
            || !self.slots.is_empty()
    }

    /// The parameters this target was created with.
    #[must_use]
    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.desc
    }

    /// Target size in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    /// Number of frame slots.
    #[must_use]
    pub fn frame_slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Records the scene's draw commands into a frame slot.
    pub fn record_slot(
        &mut self,
        device: &wgpu::Device,
        slot: usize,
        scene: &dyn SceneRecorder,
    ) -> RenderResult<()> {
        let count = self.slots.len();
        if count == 0 {
            return Err(RenderError::TargetDestroyed);
        }
        if slot >= count {
            return Err(RenderError::InvalidFrameSlot { slot, count });
        }

        let color_formats = [Some(self.desc.color_format)];
        let mut encoder = device.create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
            label: Some("capture slot encoder"),
            color_formats: &color_formats,
            depth_stencil: Some(wgpu::RenderBundleDepthStencil {
                format: self.desc.depth_format,
                depth_read_only: false,
                stencil_read_only: true,
            }),
            sample_count: 1,
            multiview: None,
        });
        scene.record_slot(slot, &mut encoder);
        let bundle = encoder.finish(&wgpu::RenderBundleDescriptor {
            label: Some("capture slot commands"),
        });
        self.slots[slot] = Some(bundle);
        Ok(())
    }

    /// Records every frame slot from the same scene.
    pub fn record_all_slots(
        &mut self,
        device: &wgpu::Device,
        scene: &dyn SceneRecorder,
    ) -> RenderResult<()> {
        for slot in 0..self.slots.len() {
            self.record_slot(device, slot, scene)?;
        }
        Ok(())
    }

    /// Pre-recorded commands of a frame slot.
    pub fn slot(&self, slot: usize) -> RenderResult<&wgpu::RenderBundle> {
        let count = self.slots.len();
        if count == 0 {
            return Err(RenderError::TargetDestroyed);
        }
        self.slots
            .get(slot)
            .ok_or(RenderError::InvalidFrameSlot { slot, count })?
            .as_ref()
            .ok_or(RenderError::SlotNotRecorded(slot))
    }

    /// Color attachment.
    pub fn color(&self) -> RenderResult<&Attachment> {
        self.color.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    /// Depth attachment.
    pub fn depth(&self) -> RenderResult<&Attachment> {
        self.depth.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    /// Framebuffer bound to both attachments.
    pub fn framebuffer(&self) -> RenderResult<&Framebuffer> {
        self.framebuffer.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    /// The capture pass.
    pub fn pass(&self) -> RenderResult<&CapturePass> {
        self.pass.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    /// Readback buffer and its layout.
    pub fn readback(&self) -> RenderResult<&ReadbackImage> {
        self.readback.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    /// Readback layout.
    pub fn readback_layout(&self) -> RenderResult<ReadbackLayout> {
        self.readback().map(|r| r.layout)
    }

    /// The capture fence.
    pub fn fence_mut(&mut self) -> RenderResult<&mut CaptureFence> {
        self.fence.as_mut().ok_or(RenderError::TargetDestroyed)
    }

    /// The render-complete signal.
    pub fn render_complete_mut(&mut self) -> RenderResult<&mut RenderCompleteSignal> {
        self.render_complete
            .as_mut()
            .ok_or(RenderError::TargetDestroyed)
    }
}

impl Drop for OffscreenCaptureTarget {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readback_layout_pads_rows() {
        // 10 px of RGBA32F is 160 bytes, padded to one 256-byte block.
        let layout = ReadbackLayout::new(10, 3, 16, 256);
        assert_eq!(layout.row_pitch, 256);
        assert_eq!(layout.size, 768);
        assert_eq!(layout.offset, 0);
    }

    #[test]
    fn test_readback_layout_exact_multiple() {
        let layout = ReadbackLayout::new(16, 2, 16, 256);
        assert_eq!(layout.row_pitch, 256);
        assert_eq!(layout.size, 512);
    }

    #[test]
    fn test_layout_for_float_format() {
        let layout = ReadbackLayout::for_format(DEFAULT_COLOR_FORMAT, 100, 4).unwrap();
        assert!(layout.row_pitch >= 100 * 16);
        assert_eq!(layout.row_pitch % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }

    #[test]
    fn test_descriptor_validation() {
        TargetDescriptor::new(4, 4, 1).validate().unwrap();
        for desc in [
            TargetDescriptor::new(0, 4, 1),
            TargetDescriptor::new(4, 4, 0),
            TargetDescriptor {
                depth_format: wgpu::TextureFormat::Rgba8Unorm,
                ..TargetDescriptor::new(4, 4, 1)
            },
        ] {
            assert!(matches!(desc.validate(), Err(RenderError::InvalidTarget(_))));
        }
    }

    #[test]
    fn test_descriptor_rejects_non_float_color() {
        // Readback conversion assumes four f32 channels per texel.
        for color_format in [
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::R32Float,
        ] {
            let desc = TargetDescriptor {
                color_format,
                ..TargetDescriptor::new(4, 4, 1)
            };
            assert!(matches!(desc.validate(), Err(RenderError::InvalidTarget(_))));
        }
    }

    #[test]
    fn test_layout_rejects_uncopyable_format() {
        assert!(ReadbackLayout::for_format(wgpu::TextureFormat::Depth24Plus, 4, 4).is_err());
    }

    #[test]
    fn test_descriptor_defaults() {
        let desc = TargetDescriptor::new(64, 32, 2);
        assert_eq!(desc.color_format, wgpu::TextureFormat::Rgba32Float);
        assert_eq!(desc.depth_format, wgpu::TextureFormat::Depth32Float);
        assert_eq!(desc.extent().depth_or_array_layers, 1);
    }
}
