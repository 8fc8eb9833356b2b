use std::collections::HashMap;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};

use crate::camera::Camera;
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{DrawCmd, DrawList};
use crate::text::FontSystem;

use super::atlas::AtlasAllocator;
use super::common::{
    alpha_blend, clamp_linear_sampler, draw_uniforms_bgl, draw_uniforms_stride, pack_uniform_slots,
    texture_bgl, DrawUniforms,
};

// ── atlas constants ────────────────────────────────────────────────────────

const ATLAS_SIZE: u32 = 2048;
const GLYPH_PADDING: u32 = 1; // pixels between glyphs in the atlas

// ── cached glyph ──────────────────────────────────────────────────────────

struct CachedGlyph {
    uv_min: [f32; 2],
    uv_max: [f32; 2],
}

// ── renderer ──────────────────────────────────────────────────────────────

/// Renderer for `DrawCmd::Text`.
///
/// Maintains a 2048 × 2048 R8Unorm glyph atlas. Glyphs are rasterized on
/// first use via fontdue and cached for the renderer's lifetime; the red
/// channel holds coverage, which the fragment stage turns into alpha.
///
/// The cache key is `fontdue::layout::GlyphRasterConfig`, which encodes font
/// identity, glyph index, and pixel size — so the same glyph at the same size
/// across multiple text commands is rasterized only once.
///
/// Each text command becomes one run of packed `vec4(pos, uv)` vertices and
/// one dynamically-offset uniform slot (transform + text color).
pub struct TextRenderer {
    // pipeline
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    uniform_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,

    // bindings (rebuilt when the atlas changes)
    atlas_bg: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_bg: Option<wgpu::BindGroup>,
    uniform_capacity: usize,

    // atlas
    atlas_texture: Option<wgpu::Texture>,
    atlas_view: Option<wgpu::TextureView>,
    allocator: AtlasAllocator,
    atlas_warned_full: bool,

    // glyph cache
    glyph_cache: HashMap<GlyphRasterConfig, CachedGlyph>,

    // geometry
    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: usize,

    // reusable fontdue layout
    layout: Layout<()>,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            uniform_bgl: None,
            texture_bgl: None,
            atlas_bg: None,
            sampler: None,
            uniform_ubo: None,
            uniform_bg: None,
            uniform_capacity: 0,
            atlas_texture: None,
            atlas_view: None,
            allocator: AtlasAllocator::new(ATLAS_SIZE, GLYPH_PADDING),
            atlas_warned_full: false,
            glyph_cache: HashMap::new(),
            vertex_vbo: None,
            vertex_capacity: 0,
            layout: Layout::new(CoordinateSystem::PositiveYDown),
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders all `DrawCmd::Text` entries in `draw_list`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &mut DrawList,
        fonts: &FontSystem,
        camera: &Camera,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_atlas(ctx);
        self.ensure_sampler(ctx);

        // ── collect text commands ──────────────────────────────────────────
        let text_cmds: Vec<_> = draw_list
            .iter_in_paint_order()
            .filter_map(|item| {
                if let DrawCmd::Text(cmd) = &item.cmd { Some(cmd.clone()) } else { None }
            })
            .collect();

        // ── build vertex runs + uniform slots ──────────────────────────────
        let transform = camera.transform();
        let mut vertices: Vec<TextVertex> = Vec::new();
        let mut slots: Vec<DrawUniforms> = Vec::new();
        let mut runs: Vec<Range<u32>> = Vec::new();

        for cmd in &text_cmds {
            let Some(font) = fonts.get(cmd.font) else {
                log::warn!("TextRenderer: unknown {:?}, skipping", cmd.font);
                continue;
            };

            self.layout.reset(&LayoutSettings {
                x: cmd.origin.x,
                y: cmd.origin.y,
                max_width: cmd.max_width,
                ..LayoutSettings::default()
            });
            self.layout.append(&[font], &TextStyle::new(&cmd.text, cmd.size, 0));

            // Snapshot glyph positions into a plain Vec so that the borrow on
            // `self.layout` ends before we call `self.place_glyph` (which
            // needs `&mut self`).
            let glyph_snap: Vec<(GlyphRasterConfig, f32, f32, usize, usize)> = self
                .layout
                .glyphs()
                .iter()
                .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
                .map(|g| (g.key, g.x, g.y, g.width, g.height))
                .collect();

            let run_start = vertices.len() as u32;

            for (key, x, y, w, h) in glyph_snap {
                // Rasterize + upload on first encounter.
                if !self.glyph_cache.contains_key(&key) {
                    let (metrics, bitmap) = font.rasterize_config(key);
                    if metrics.width == 0 || metrics.height == 0 {
                        continue;
                    }
                    if let Some(entry) = self.place_glyph(
                        ctx,
                        &bitmap,
                        metrics.width as u32,
                        metrics.height as u32,
                    ) {
                        self.glyph_cache.insert(key, entry);
                    }
                }

                let Some(cached) = self.glyph_cache.get(&key) else { continue };

                push_glyph_quad(
                    &mut vertices,
                    [x, y],
                    [x + w as f32, y + h as f32],
                    cached.uv_min,
                    cached.uv_max,
                );
            }

            let run_end = vertices.len() as u32;
            if run_end > run_start {
                slots.push(DrawUniforms::new(&transform, cmd.color.rgb_array()));
                runs.push(run_start..run_end);
            }
        }

        if runs.is_empty() {
            return;
        }

        // ── mutable operations before any immutable borrows ────────────────
        let stride = draw_uniforms_stride(ctx.device);
        self.ensure_uniform_capacity(ctx, slots.len(), stride);
        self.ensure_vertex_capacity(ctx, vertices.len());
        self.ensure_atlas_bind_group(ctx);

        let Some(uniform_ubo) = self.uniform_ubo.as_ref() else { return };
        ctx.queue
            .write_buffer(uniform_ubo, 0, &pack_uniform_slots(&slots, stride));

        let Some(vertex_vbo) = self.vertex_vbo.as_ref() else { return };
        ctx.queue
            .write_buffer(vertex_vbo, 0, bytemuck::cast_slice(&vertices));

        // ── immutable borrows ──────────────────────────────────────────────
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(uniform_bg) = self.uniform_bg.as_ref() else { return };
        let Some(atlas_bg) = self.atlas_bg.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sienna text pass"),
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
        rpass.set_vertex_buffer(0, vertex_vbo.slice(..));
        rpass.set_bind_group(1, atlas_bg, &[]);

        for (i, run) in runs.iter().enumerate() {
            rpass.set_bind_group(0, uniform_bg, &[(i as u64 * stride) as u32]);
            rpass.draw(run.clone(), 0..1);
        }
    }

    // ── atlas helpers ──────────────────────────────────────────────────────

    fn place_glyph(
        &mut self,
        ctx: &RenderCtx<'_>,
        bitmap: &[u8],
        w: u32,
        h: u32,
    ) -> Option<CachedGlyph> {
        let Some((gx, gy)) = self.allocator.allocate(w, h) else {
            if self.allocator.is_full() && !self.atlas_warned_full {
                log::warn!(
                    "TextRenderer: glyph atlas is full ({ATLAS_SIZE}×{ATLAS_SIZE}); \
                     some glyphs will not be rendered"
                );
                self.atlas_warned_full = true;
            }
            return None;
        };

        let atlas = self.atlas_texture.as_ref()?;

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: atlas,
                mip_level: 0,
                origin: wgpu::Origin3d { x: gx, y: gy, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            bitmap,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );

        let atlas_f = ATLAS_SIZE as f32;
        Some(CachedGlyph {
            uv_min: [gx as f32 / atlas_f, gy as f32 / atlas_f],
            uv_max: [(gx + w) as f32 / atlas_f, (gy + h) as f32 / atlas_f],
        })
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sienna text shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let uniform_bgl = draw_uniforms_bgl(ctx.device, "sienna text uniforms bgl");
        let texture_bgl = texture_bgl(ctx.device, "sienna text atlas bgl");

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sienna text pipeline layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sienna text pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[TextVertex::layout()],
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
        self.atlas_bg = None;
        self.uniform_ubo = None;
        self.uniform_bg = None;
        self.uniform_capacity = 0;
    }

    fn ensure_atlas(&mut self, ctx: &RenderCtx<'_>) {
        if self.atlas_texture.is_some() {
            return;
        }

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sienna glyph atlas"),
            size: wgpu::Extent3d {
                width: ATLAS_SIZE,
                height: ATLAS_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.atlas_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.atlas_texture = Some(texture);
        self.atlas_bg = None;
        self.allocator = AtlasAllocator::new(ATLAS_SIZE, GLYPH_PADDING);
        self.atlas_warned_full = false;
        self.glyph_cache.clear();
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_none() {
            self.sampler = Some(clamp_linear_sampler(ctx.device, "sienna text sampler"));
        }
    }

    fn ensure_atlas_bind_group(&mut self, ctx: &RenderCtx<'_>) {
        if self.atlas_bg.is_some() {
            return;
        }
        let (Some(bgl), Some(view), Some(sampler)) = (
            self.texture_bgl.as_ref(),
            self.atlas_view.as_ref(),
            self.sampler.as_ref(),
        ) else {
            return;
        };

        self.atlas_bg = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sienna text atlas bind group"),
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
        }));
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize, stride: u64) {
        if required <= self.uniform_capacity && self.uniform_ubo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(16);
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sienna text uniform ubo"),
            size: new_cap as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let Some(bgl) = self.uniform_bgl.as_ref() else { return };
        self.uniform_bg = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sienna text uniform bind group"),
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

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.vertex_capacity && self.vertex_vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(6 * 64);
        self.vertex_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sienna text vertex vbo"),
            size: (new_cap * std::mem::size_of::<TextVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Text vertex: position and UV packed into one vec4 attribute.
///
///  offset 0  pos_uv  [f32; 4]   loc 0   (xy = position, zw = uv)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct TextVertex {
    pos_uv: [f32; 4],
}

impl TextVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

    #[inline]
    fn pack(pos: [f32; 2], uv: [f32; 2]) -> Self {
        Self { pos_uv: [pos[0], pos[1], uv[0], uv[1]] }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Appends the six vertices (two triangles) of one glyph quad.
fn push_glyph_quad(
    out: &mut Vec<TextVertex>,
    dst_min: [f32; 2],
    dst_max: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
) {
    let tl = TextVertex::pack(dst_min, uv_min);
    let tr = TextVertex::pack([dst_max[0], dst_min[1]], [uv_max[0], uv_min[1]]);
    let bl = TextVertex::pack([dst_min[0], dst_max[1]], [uv_min[0], uv_max[1]]);
    let br = TextVertex::pack(dst_max, uv_max);

    out.extend_from_slice(&[tl, tr, br, tl, br, bl]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix4, Vector4};

    // ── packed attribute ──────────────────────────────────────────────────

    #[test]
    fn pack_places_position_then_uv() {
        let v = TextVertex::pack([1.0, 2.0], [0.25, 0.75]);
        assert_eq!(v.pos_uv, [1.0, 2.0, 0.25, 0.75]);
    }

    #[test]
    fn packed_vertex_transforms_like_separate_attributes() {
        // The packed layout must be a pure re-encoding: running xy through
        // the transform gives the same clip position the sprite stage would
        // produce for position = (x, y), and zw is the untouched UV.
        let m = Matrix4::new_translation(&nalgebra::Vector3::new(3.0, -2.0, 0.0))
            * Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(2.0, 2.0, 1.0));

        let pos = [5.0f32, 7.0];
        let uv = [0.125f32, 0.875];
        let packed = TextVertex::pack(pos, uv);

        let from_packed = m * Vector4::new(packed.pos_uv[0], packed.pos_uv[1], 0.0, 1.0);
        let from_separate = m * Vector4::new(pos[0], pos[1], 0.0, 1.0);

        assert_eq!(from_packed, from_separate);
        assert_eq!([packed.pos_uv[2], packed.pos_uv[3]], uv);
    }

    // ── glyph quads ───────────────────────────────────────────────────────

    #[test]
    fn glyph_quad_covers_destination_rect() {
        let mut verts = Vec::new();
        push_glyph_quad(&mut verts, [10.0, 20.0], [16.0, 28.0], [0.0, 0.0], [0.5, 0.5]);
        assert_eq!(verts.len(), 6);

        let xs: Vec<f32> = verts.iter().map(|v| v.pos_uv[0]).collect();
        let ys: Vec<f32> = verts.iter().map(|v| v.pos_uv[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 16.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 28.0);
    }

    #[test]
    fn glyph_quad_uv_tracks_corners() {
        let mut verts = Vec::new();
        push_glyph_quad(&mut verts, [0.0, 0.0], [1.0, 1.0], [0.1, 0.2], [0.3, 0.4]);

        // Destination top-left carries uv_min, bottom-right carries uv_max.
        for v in &verts {
            let (x, y, u, w) = (v.pos_uv[0], v.pos_uv[1], v.pos_uv[2], v.pos_uv[3]);
            let expect_u = if x == 0.0 { 0.1 } else { 0.3 };
            let expect_v = if y == 0.0 { 0.2 } else { 0.4 };
            assert_eq!(u, expect_u);
            assert_eq!(w, expect_v);
        }
    }
}
