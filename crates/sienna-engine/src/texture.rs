//! Sprite texture storage.
//!
//! Textures are immutable after upload and addressed by copyable
//! [`TextureId`] handles, so draw commands stay `Copy`-friendly and the
//! renderer can cache per-texture bind groups. The store is owned by the
//! application and passed to [`crate::render::SpriteRenderer::render`].

use std::fmt;

/// Error returned by texture load operations.
#[derive(Debug, Clone)]
pub enum TextureError {
    /// The byte stream could not be decoded as a PNG image.
    Decode(String),
    /// A raw pixel buffer did not match `width * height * 4` bytes.
    SizeMismatch { expected: usize, got: usize },
    /// Width or height was zero.
    ZeroSize,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Decode(msg) => write!(f, "texture decode error: {msg}"),
            TextureError::SizeMismatch { expected, got } => {
                write!(f, "texture pixel buffer size mismatch: expected {expected} bytes, got {got}")
            }
            TextureError::ZeroSize => write!(f, "texture dimensions must be non-zero"),
        }
    }
}

impl std::error::Error for TextureError {}

/// Opaque handle to a texture loaded into a [`TextureStore`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub(crate) usize);

struct TextureEntry {
    // Kept alive for the view's sake; wgpu destroys the texture on drop.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Owns a collection of uploaded RGBA textures.
pub struct TextureStore {
    textures: Vec<TextureEntry>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self { textures: Vec::new() }
    }

    /// Decodes a PNG byte stream and uploads it as an sRGB RGBA texture.
    pub fn load_png(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
    ) -> Result<TextureId, TextureError> {
        let (pixels, width, height) = decode_png(bytes)?;
        self.from_rgba8(device, queue, &pixels, width, height)
    }

    /// Uploads a raw straight-alpha RGBA8 pixel buffer (row-major, top-left
    /// origin) as an sRGB texture.
    pub fn from_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureId, TextureError> {
        validate_rgba8(pixels.len(), width, height)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sienna sprite texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.textures.len());
        self.textures.push(TextureEntry {
            _texture: texture,
            view,
            width,
            height,
        });
        Ok(id)
    }

    /// Returns `(width, height)` in pixels, if `id` is valid.
    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(id.0).map(|t| (t.width, t.height))
    }

    pub(crate) fn view(&self, id: TextureId) -> Option<&wgpu::TextureView> {
        self.textures.get(id.0).map(|t| &t.view)
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_png(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), TextureError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| TextureError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

fn validate_rgba8(len: usize, width: u32, height: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroSize);
    }
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(TextureError::SizeMismatch { expected, got: len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn validate_accepts_exact_buffer() {
        assert!(validate_rgba8(2 * 3 * 4, 2, 3).is_ok());
    }

    #[test]
    fn validate_rejects_short_buffer() {
        match validate_rgba8(7, 2, 2) {
            Err(TextureError::SizeMismatch { expected: 16, got: 7 }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        assert!(matches!(validate_rgba8(0, 0, 4), Err(TextureError::ZeroSize)));
        assert!(matches!(validate_rgba8(0, 4, 0), Err(TextureError::ZeroSize)));
    }

    // ── decode ────────────────────────────────────────────────────────────

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_png(&[0xde, 0xad, 0xbe, 0xef]),
            Err(TextureError::Decode(_))
        ));
    }

    #[test]
    fn decode_roundtrips_encoded_png() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();

        let (pixels, w, h) = decode_png(bytes.get_ref()).unwrap();
        assert_eq!((w, h), (3, 2));
        assert_eq!(pixels.len(), 3 * 2 * 4);
        assert_eq!(&pixels[..4], &[10, 20, 30, 255]);
    }
}
