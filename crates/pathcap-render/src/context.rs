//! Headless GPU bootstrap.

use crate::error::{RenderError, RenderResult};
use crate::target::{DEFAULT_COLOR_FORMAT, DEFAULT_DEPTH_FORMAT};

/// Whether `adapter` can render into and copy out of the capture attachments.
#[must_use]
pub fn supports_capture_formats(
    adapter: &wgpu::Adapter,
    color: wgpu::TextureFormat,
    depth: wgpu::TextureFormat,
) -> bool {
    let color_usages = adapter.get_texture_format_features(color).allowed_usages;
    let depth_usages = adapter.get_texture_format_features(depth).allowed_usages;
    color_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC)
        && depth_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
}

/// A device and its single submission queue, with no presentation surface.
pub struct GpuContext {
    /// The adapter the device was created on.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The queue every capture submission goes to.
    pub queue: wgpu::Queue,
    /// Information about the selected adapter.
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Creates a headless context.
    ///
    /// Adapters are tried high-performance first, then low-power, then the
    /// software fallback. The first one that can render the default capture
    /// formats wins; if none can, the first adapter found is used and target
    /// creation reports the unsupported format.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let preferences = [
            (wgpu::PowerPreference::HighPerformance, false),
            (wgpu::PowerPreference::LowPower, false),
            (wgpu::PowerPreference::None, true),
        ];
        let mut first_found = None;
        let mut capable = None;
        for (power_preference, force_fallback_adapter) in preferences {
            let Ok(candidate) = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference,
                    compatible_surface: None,
                    force_fallback_adapter,
                })
                .await
            else {
                continue;
            };
            if supports_capture_formats(&candidate, DEFAULT_COLOR_FORMAT, DEFAULT_DEPTH_FORMAT) {
                capable = Some(candidate);
                break;
            }
            log::debug!(
                "Adapter {} cannot render {DEFAULT_COLOR_FORMAT:?}",
                candidate.get_info().name
            );
            if first_found.is_none() {
                first_found = Some(candidate);
            }
        }
        let adapter = match (capable, first_found) {
            (Some(adapter), _) => adapter,
            (None, Some(adapter)) => {
                log::warn!(
                    "No adapter can render {DEFAULT_COLOR_FORMAT:?}, using {}",
                    adapter.get_info().name
                );
                adapter
            }
            (None, None) => return Err(RenderError::AdapterCreationFailed),
        };

        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pathcap device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
            adapter_info,
        })
    }

    /// Whether this context's adapter can render and read back the given formats.
    #[must_use]
    pub fn supports_capture_formats(
        &self,
        color: wgpu::TextureFormat,
        depth: wgpu::TextureFormat,
    ) -> bool {
        supports_capture_formats(&self.adapter, color, depth)
    }
}
