use super::sprite::SpriteCmd;
use super::text::TextCmd;

/// Renderer-agnostic draw command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Sprite(SpriteCmd),
    Text(TextCmd),
}
