//! Scene (draw stream) types.
//!
//! Responsibilities:
//! - store renderer-agnostic draw commands
//! - provide deterministic ordering (z-index + insertion order)
//! - keep command-specific helpers isolated per command file
//!
//! Extending the scene:
//! - add a new command module here with its payload + push helper
//! - add a variant to `DrawCmd`
//! - add a matching renderer under `render::*`

mod cmd;
mod key;
mod list;
mod sprite;
mod text;
mod z_index;

pub use cmd::DrawCmd;
pub use key::SortKey;
pub use list::{DrawItem, DrawList};
pub use sprite::SpriteCmd;
pub use text::TextCmd;
pub use z_index::ZIndex;
