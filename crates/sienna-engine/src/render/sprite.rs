use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Vector3};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::coords::Vec2;
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{DrawCmd, DrawList};
use crate::texture::{TextureId, TextureStore};

use super::common::{
    alpha_blend, clamp_linear_sampler, draw_uniforms_bgl, draw_uniforms_stride, pack_uniform_slots,
    texture_bgl, DrawUniforms,
};

/// Renderer for `DrawCmd::Sprite`.
///
/// Each sprite is a unit quad expanded by a model matrix (translate, rotate
/// about center, scale to size) and shaded as `tint × textureSample`. Every
/// sprite gets its own 256-byte-aligned slot in a dynamically-offset uniform
/// buffer, so one buffer write serves the whole frame.
#[derive(Default)]
pub struct SpriteRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    uniform_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_bg: Option<wgpu::BindGroup>,
    uniform_capacity: usize,

    sampler: Option<wgpu::Sampler>,
    // Textures are immutable once loaded, so cached bind groups stay valid
    // until the pipeline (and its layout) is rebuilt.
    texture_bind_groups: HashMap<TextureId, wgpu::BindGroup>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl SpriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders all `DrawCmd::Sprite` entries in `draw_list`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &mut DrawList,
        textures: &TextureStore,
        camera: &Camera,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_sampler(ctx);
        self.ensure_static_buffers(ctx);

        // ── build per-sprite uniform slots in paint order ──────────────────
        let view_proj = camera.transform();
        let mut slots: Vec<DrawUniforms> = Vec::new();
        let mut slot_textures: Vec<TextureId> = Vec::new();

        for item in draw_list.iter_in_paint_order() {
            let DrawCmd::Sprite(cmd) = &item.cmd else { continue };

            if cmd.size.x <= 0.0 || cmd.size.y <= 0.0 {
                continue;
            }
            if textures.view(cmd.texture).is_none() {
                log::warn!("SpriteRenderer: unknown {:?}, skipping", cmd.texture);
                continue;
            }

            let transform = view_proj * model_matrix(cmd.position, cmd.size, cmd.rotation);
            slots.push(DrawUniforms::new(&transform, cmd.tint.rgb_array()));
            slot_textures.push(cmd.texture);
        }

        if slots.is_empty() {
            return;
        }

        // ── mutable operations before any immutable borrows ────────────────
        let stride = draw_uniforms_stride(ctx.device);
        self.ensure_uniform_capacity(ctx, slots.len(), stride);
        self.ensure_texture_bind_groups(ctx, textures, &slot_textures);

        let Some(uniform_ubo) = self.uniform_ubo.as_ref() else { return };
        ctx.queue
            .write_buffer(uniform_ubo, 0, &pack_uniform_slots(&slots, stride));

        // ── immutable borrows ──────────────────────────────────────────────
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(uniform_bg) = self.uniform_bg.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sienna sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        for (i, id) in slot_textures.iter().enumerate() {
            let Some(texture_bg) = self.texture_bind_groups.get(id) else { continue };
            rpass.set_bind_group(0, uniform_bg, &[(i as u64 * stride) as u32]);
            rpass.set_bind_group(1, texture_bg, &[]);
            rpass.draw_indexed(0..6, 0, 0..1);
        }
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sienna sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let uniform_bgl = draw_uniforms_bgl(ctx.device, "sienna sprite uniforms bgl");
        let texture_bgl = texture_bgl(ctx.device, "sienna sprite texture bgl");

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sienna sprite pipeline layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sienna sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.uniform_bgl = Some(uniform_bgl);
        self.texture_bgl = Some(texture_bgl);

        // Layout changed: existing bindings are invalid.
        self.uniform_ubo = None;
        self.uniform_bg = None;
        self.uniform_capacity = 0;
        self.texture_bind_groups.clear();
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_none() {
            self.sampler = Some(clamp_linear_sampler(ctx.device, "sienna sprite sampler"));
        }
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sienna sprite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sienna sprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize, stride: u64) {
        if required <= self.uniform_capacity && self.uniform_ubo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sienna sprite uniform ubo"),
            size: new_cap as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let Some(bgl) = self.uniform_bgl.as_ref() else { return };
        self.uniform_bg = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sienna sprite uniform bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: Some(super::common::draw_uniforms_min_binding_size()),
                }),
            }],
        }));
        self.uniform_ubo = Some(ubo);
        self.uniform_capacity = new_cap;
    }

    fn ensure_texture_bind_groups(
        &mut self,
        ctx: &RenderCtx<'_>,
        textures: &TextureStore,
        used: &[TextureId],
    ) {
        let (Some(bgl), Some(sampler)) = (self.texture_bgl.as_ref(), self.sampler.as_ref()) else {
            return;
        };

        for &id in used {
            if self.texture_bind_groups.contains_key(&id) {
                continue;
            }
            let Some(view) = textures.view(id) else { continue };
            let bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sienna sprite texture bind group"),
                layout: bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });
            self.texture_bind_groups.insert(id, bg);
        }
    }
}

/// Builds the sprite model matrix: translate to `position`, rotate about the
/// quad center, scale the unit quad up to `size`.
fn model_matrix(position: Vec2, size: Vec2, rotation: f32) -> Matrix4<f32> {
    let half = Vector3::new(size.x / 2.0, size.y / 2.0, 0.0);

    Matrix4::new_translation(&Vector3::new(position.x, position.y, 0.0))
        * Matrix4::new_translation(&half)
        * Matrix4::new_rotation(Vector3::z() * rotation)
        * Matrix4::new_translation(&-half)
        * Matrix4::new_nonuniform_scaling(&Vector3::new(size.x, size.y, 1.0))
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Sprite vertex: separate position and UV attributes.
///
///  offset 0  position  [f32; 2]   loc 0
///  offset 8  uv        [f32; 2]   loc 1
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpriteVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// Unit quad; UV equals position so the texture maps the full quad upright.
const QUAD_VERTICES: [SpriteVertex; 4] = [
    SpriteVertex { position: [0.0, 0.0], uv: [0.0, 0.0] },
    SpriteVertex { position: [1.0, 0.0], uv: [1.0, 0.0] },
    SpriteVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
    SpriteVertex { position: [0.0, 1.0], uv: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn apply(m: &Matrix4<f32>, x: f32, y: f32) -> (f32, f32) {
        let v = m * Vector4::new(x, y, 0.0, 1.0);
        (v.x, v.y)
    }

    fn assert_approx(got: (f32, f32), want: (f32, f32)) {
        assert!(
            (got.0 - want.0).abs() < 1e-4 && (got.1 - want.1).abs() < 1e-4,
            "{got:?} != {want:?}"
        );
    }

    // ── model matrix ──────────────────────────────────────────────────────

    #[test]
    fn unrotated_quad_spans_position_to_position_plus_size() {
        let m = model_matrix(Vec2::new(10.0, 20.0), Vec2::new(40.0, 30.0), 0.0);
        assert_approx(apply(&m, 0.0, 0.0), (10.0, 20.0));
        assert_approx(apply(&m, 1.0, 1.0), (50.0, 50.0));
    }

    #[test]
    fn rotation_fixes_the_center() {
        let m = model_matrix(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 1.234);
        assert_approx(apply(&m, 0.5, 0.5), (5.0, 5.0));
    }

    #[test]
    fn quarter_turn_maps_corners() {
        let m = model_matrix(Vec2::zero(), Vec2::new(2.0, 2.0), std::f32::consts::FRAC_PI_2);
        // +90° about +Z sends the top-left unit corner to the top-right.
        assert_approx(apply(&m, 0.0, 0.0), (2.0, 0.0));
        assert_approx(apply(&m, 1.0, 0.0), (2.0, 2.0));
    }

    // ── quad geometry ─────────────────────────────────────────────────────

    #[test]
    fn quad_uv_matches_position() {
        for v in QUAD_VERTICES {
            assert_eq!(v.position, v.uv);
        }
    }

    #[test]
    fn quad_indices_form_two_ccw_triangles() {
        assert_eq!(QUAD_INDICES, [0, 1, 2, 0, 2, 3]);
    }
}
