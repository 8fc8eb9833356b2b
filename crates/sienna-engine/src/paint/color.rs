/// Straight-alpha RGBA color with components in `[0, 1]`.
///
/// Sprite tints and text colors consume only the RGB channels (the
/// pipelines derive alpha from the texture sample); `a` is carried for
/// clear colors and future use.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// The RGB channels as an array, as uploaded to the per-draw uniform.
    #[inline]
    pub fn rgb_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Clamps all channels to `[0, 1]`.
    ///
    /// Intended for user-provided inputs.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_forces_opaque_alpha() {
        assert_eq!(Color::rgb(0.2, 0.4, 0.6).a, 1.0);
    }

    #[test]
    fn from_srgb_u8_maps_extremes() {
        let c = Color::from_srgb_u8(0, 255, 0, 255);
        assert_eq!(c, Color::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn clamped_bounds_channels() {
        let c = Color::rgba(-1.0, 2.0, 0.5, 1.5).clamped();
        assert_eq!(c, Color::rgba(0.0, 1.0, 0.5, 1.0));
    }

    #[test]
    fn rgb_array_drops_alpha() {
        assert_eq!(Color::rgba(0.1, 0.2, 0.3, 0.4).rgb_array(), [0.1, 0.2, 0.3]);
    }
}
