//! GPU rendering subsystem.
//!
//! Renderers consume `scene` draw streams and issue GPU commands via wgpu.
//! Each renderer is responsible for its own GPU resources (pipelines,
//! buffers, bind groups).
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - The vertex shader converts to clip space with a per-draw `transform`
//!   matrix supplied by the camera (`projection * view`, plus a model
//!   matrix for sprites).

mod atlas;
mod common;
mod ctx;
mod sprite;
mod text;

pub use ctx::{RenderCtx, RenderTarget};
pub use sprite::SpriteRenderer;
pub use text::TextRenderer;
