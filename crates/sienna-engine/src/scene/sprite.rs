use crate::coords::Vec2;
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList, ZIndex};
use crate::texture::TextureId;

/// Sprite draw payload.
///
/// The quad covers `position .. position + size` in logical pixels and
/// rotates about its own center. The tint multiplies the texture sample
/// componentwise; only its RGB channels are used (alpha comes from the
/// texture).
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteCmd {
    pub texture: TextureId,
    /// Top-left corner in logical pixels.
    pub position: Vec2,
    /// Quad extent in logical pixels.
    pub size: Vec2,
    /// Rotation about the sprite center, radians, clockwise (+Y is down).
    pub rotation: f32,
    pub tint: Color,
}

impl DrawList {
    /// Records a sprite draw command.
    pub fn push_sprite(
        &mut self,
        z: ZIndex,
        texture: TextureId,
        position: Vec2,
        size: Vec2,
        rotation: f32,
        tint: Color,
    ) {
        self.push(z, DrawCmd::Sprite(SpriteCmd {
            texture,
            position,
            size,
            rotation,
            tint,
        }));
    }
}
