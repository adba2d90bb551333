//! Scene collaborators that fill frame slots with draw commands.

use glam::{Mat4, Vec3, Vec4};
use pathcap_core::FeatureChannel;
use wgpu::util::DeviceExt;

use crate::camera::Camera;

/// Records scene draws into frame slots and keeps their per-frame data current.
///
/// Slot commands are recorded once; [`SceneRecorder::update`] runs before each
/// capture so the recorded commands see the current camera and debug view.
pub trait SceneRecorder {
    /// Records the draws of frame slot `slot`.
    fn record_slot<'a>(&'a self, slot: usize, encoder: &mut wgpu::RenderBundleEncoder<'a>);

    /// Uploads the camera and feature channel the next capture of `slot` uses.
    fn update(&self, queue: &wgpu::Queue, slot: usize, camera: &Camera, channel: FeatureChannel);
}

/// GPU layout of the debug scene uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub debug_view: u32,
    pub _padding: [u32; 3],
}

impl SceneUniforms {
    /// Uniforms for a camera and feature channel.
    #[must_use]
    pub fn new(camera: &Camera, channel: FeatureChannel) -> Self {
        Self {
            view_proj: (CLIP_FLIP_Y * camera.view_projection_matrix()).to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: LIGHT_DIRECTION.normalize().extend(0.0).to_array(),
            debug_view: channel.debug_view_index(),
            _padding: [0; 3],
        }
    }
}

/// Direction toward the key light.
const LIGHT_DIRECTION: Vec3 = Vec3::new(0.4, 1.0, 0.3);

/// Clip-space Y mirror.
///
/// Exported files store readback row 0 as their bottom row, so the scene is
/// rendered mirrored to come out upright.
pub const CLIP_FLIP_Y: Mat4 = Mat4::from_cols(
    Vec4::X,
    Vec4::NEG_Y,
    Vec4::Z,
    Vec4::W,
);

/// Scene vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub albedo: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Triangle mesh built from axis-aligned boxes.
#[derive(Debug, Default, Clone)]
pub struct BoxMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl BoxMesh {
    /// Appends a box with outward-facing, counter-clockwise faces.
    pub fn push_box(&mut self, min: Vec3, max: Vec3, albedo: [f32; 3]) {
        let center = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        // (normal, u, v) with u x v = normal
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];
        for (normal, u, v) in faces {
            let base = self.vertices.len() as u32;
            let face_center = center + normal * half;
            let (u, v) = (u * half, v * half);
            for corner in [-u - v, u - v, u + v, v - u] {
                self.vertices.push(Vertex {
                    position: (face_center + corner).to_array(),
                    normal: normal.to_array(),
                    albedo,
                });
            }
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    /// The debug scene: a ground slab with a 3x3 grid of colored boxes.
    #[must_use]
    pub fn debug_scene() -> Self {
        let mut mesh = Self::default();
        mesh.push_box(
            Vec3::new(-20.0, -0.5, -20.0),
            Vec3::new(20.0, 0.0, 20.0),
            [0.6, 0.6, 0.6],
        );
        for i in 0..3 {
            for j in 0..3 {
                let x = (i as f32 - 1.0) * 4.0;
                let z = (j as f32 - 1.0) * 4.0;
                let height = 1.0 + (i * 3 + j) as f32 * 0.35;
                let albedo = [
                    0.2 + 0.35 * i as f32,
                    0.25 + 0.3 * j as f32,
                    0.9 - 0.3 * i as f32,
                ];
                mesh.push_box(
                    Vec3::new(x - 0.75, 0.0, z - 0.75),
                    Vec3::new(x + 0.75, height, z + 0.75),
                    albedo,
                );
            }
        }
        mesh
    }
}

struct SlotResources {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Built-in procedural scene rendering the shaded view or a debug channel.
pub struct DebugScene {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    slots: Vec<SlotResources>,
}

impl DebugScene {
    /// Builds the scene for targets of the given formats with `slot_count` frame slots.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        slot_count: usize,
    ) -> Self {
        let mesh = BoxMesh::debug_scene();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Debug Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Debug Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/debug_scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Debug Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Debug Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    // Float targets are not blendable on every adapter.
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // The Y mirror reverses screen-space winding.
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Scene Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Scene Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let initial = SceneUniforms::new(&Camera::default(), FeatureChannel::Shaded);
        let slots = (0..slot_count.max(1))
            .map(|_| {
                let uniform_buffer =
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Debug Scene Uniform Buffer"),
                        contents: bytemuck::cast_slice(&[initial]),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Debug Scene Bind Group"),
                    layout: &bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                });
                SlotResources {
                    uniform_buffer,
                    bind_group,
                }
            })
            .collect();

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            slots,
        }
    }

    fn slot_resources(&self, slot: usize) -> &SlotResources {
        &self.slots[slot % self.slots.len()]
    }
}

impl SceneRecorder for DebugScene {
    fn record_slot<'a>(&'a self, slot: usize, encoder: &mut wgpu::RenderBundleEncoder<'a>) {
        encoder.set_pipeline(&self.pipeline);
        encoder.set_bind_group(0, &self.slot_resources(slot).bind_group, &[]);
        encoder.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        encoder.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        encoder.draw_indexed(0..self.index_count, 0, 0..1);
    }

    fn update(&self, queue: &wgpu::Queue, slot: usize, camera: &Camera, channel: FeatureChannel) {
        let uniforms = SceneUniforms::new(camera, channel);
        queue.write_buffer(
            &self.slot_resources(slot).uniform_buffer,
            0,
            bytemuck::cast_slice(&[uniforms]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 112);
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn test_uniforms_carry_debug_view() {
        let camera = Camera::default();
        for channel in FeatureChannel::ALL {
            let uniforms = SceneUniforms::new(&camera, channel);
            assert_eq!(uniforms.debug_view, channel.debug_view_index());
        }
    }

    #[test]
    fn test_clip_flip_mirrors_y_only() {
        let p = glam::Vec4::new(0.25, 0.5, 0.75, 1.0);
        assert_eq!(CLIP_FLIP_Y * p, glam::Vec4::new(0.25, -0.5, 0.75, 1.0));
    }

    #[test]
    fn test_box_faces_point_outward() {
        let mut mesh = BoxMesh::default();
        mesh.push_box(Vec3::splat(-1.0), Vec3::splat(1.0), [1.0; 3]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                Vec3::from_array(mesh.vertices[i as usize].position)
            });
            let normal = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            let winding = (b - a).cross(c - a);
            assert!(winding.dot(normal) > 0.0, "face {normal} wound clockwise");
            // Every vertex of a face lies on the face plane.
            assert!((a.dot(normal) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_debug_scene_sits_on_ground() {
        let mesh = BoxMesh::debug_scene();
        assert_eq!(mesh.vertices.len(), 24 * 10);
        let max_y = mesh
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        let min_y = mesh
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MAX, f32::min);
        assert_eq!(min_y, -0.5);
        assert!(max_y > 1.0);
    }
}
