//! Shared GPU types and utilities used by both pipeline renderers.

use bytemuck::{Pod, Zeroable};
use nalgebra::Matrix4;

// ── blend ─────────────────────────────────────────────────────────────────

/// Standard straight-alpha blending (`SrcAlpha` / `OneMinusSrcAlpha`).
///
/// Both pipelines produce straight-alpha output: sprites take alpha from the
/// texture sample, text takes it from the coverage channel.
pub(super) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── per-draw uniforms ─────────────────────────────────────────────────────

/// Per-draw uniform block shared by both pipelines.
///
/// Layout must match the WGSL `DrawUniforms` struct:
///  offset  0  transform  mat4x4<f32>
///  offset 64  color      vec3<f32>  (+ 4 bytes implicit padding)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct DrawUniforms {
    pub transform: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub _pad: f32,
}

impl DrawUniforms {
    pub(super) fn new(transform: &Matrix4<f32>, color: [f32; 3]) -> Self {
        Self {
            transform: (*transform).into(),
            color,
            _pad: 0.0,
        }
    }
}

/// Returns the `wgpu` minimum binding size for the per-draw uniform block.
///
/// `DrawUniforms` is 80 bytes, so its size is always non-zero. Centralising
/// this avoids `.unwrap()` at each renderer's pipeline-creation site.
pub(super) fn draw_uniforms_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64)
        .expect("DrawUniforms has non-zero size by construction")
}

/// Rounds `size` up to the next multiple of `align`.
pub(super) fn align_up(size: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    size.next_multiple_of(align)
}

/// The per-slot stride for dynamically-offset `DrawUniforms`, honoring the
/// device's uniform offset alignment (commonly 256).
pub(super) fn draw_uniforms_stride(device: &wgpu::Device) -> u64 {
    let align = device.limits().min_uniform_buffer_offset_alignment as u64;
    align_up(std::mem::size_of::<DrawUniforms>() as u64, align)
}

/// Bind group layout for the per-draw uniform slot (group 0).
pub(super) fn draw_uniforms_bgl(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: Some(draw_uniforms_min_binding_size()),
            },
            count: None,
        }],
    })
}

/// Bind group layout for a sampled 2D texture + filtering sampler (group 1).
pub(super) fn texture_bgl(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Clamp-to-edge linear sampler shared by both pipelines.
pub(super) fn clamp_linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// Packs per-draw uniform slots into a single staging byte buffer, one
/// aligned stride apart, ready for `queue.write_buffer`.
pub(super) fn pack_uniform_slots(slots: &[DrawUniforms], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; slots.len() * stride];
    for (i, slot) in slots.iter().enumerate() {
        let src = bytemuck::bytes_of(slot);
        bytes[i * stride..i * stride + src.len()].copy_from_slice(src);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    // ── uniform layout ────────────────────────────────────────────────────

    #[test]
    fn draw_uniforms_matches_wgsl_layout() {
        assert_eq!(offset_of!(DrawUniforms, transform), 0);
        assert_eq!(offset_of!(DrawUniforms, color), 64);
        assert_eq!(size_of::<DrawUniforms>(), 80);
    }

    #[test]
    fn draw_uniforms_transform_is_column_major() {
        let m = Matrix4::new(
            1.0, 2.0, 3.0, 4.0, //
            5.0, 6.0, 7.0, 8.0, //
            9.0, 10.0, 11.0, 12.0, //
            13.0, 14.0, 15.0, 16.0,
        );
        let u = DrawUniforms::new(&m, [0.0; 3]);
        // First column of the matrix (m[0][j]) lands in the first array row,
        // as WGSL's mat4x4 expects.
        assert_eq!(u.transform[0], [1.0, 5.0, 9.0, 13.0]);
        assert_eq!(u.transform[3], [4.0, 8.0, 12.0, 16.0]);
    }

    // ── stride ────────────────────────────────────────────────────────────

    #[test]
    fn align_up_rounds_to_alignment() {
        assert_eq!(align_up(80, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(0, 64), 0);
    }

    // ── slot packing ──────────────────────────────────────────────────────

    #[test]
    fn pack_uniform_slots_places_each_at_stride() {
        let a = DrawUniforms::new(&Matrix4::identity(), [1.0, 0.0, 0.0]);
        let b = DrawUniforms::new(&Matrix4::identity(), [0.0, 1.0, 0.0]);
        let bytes = pack_uniform_slots(&[a, b], 256);

        assert_eq!(bytes.len(), 512);
        assert_eq!(&bytes[..80], bytemuck::bytes_of(&a));
        assert_eq!(&bytes[256..336], bytemuck::bytes_of(&b));
        // Padding between slots stays zeroed.
        assert!(bytes[80..256].iter().all(|&x| x == 0));
    }
}
