//! Sienna engine crate.
//!
//! A small 2D renderer: sprites (textured quads with a tint) and text
//! (glyph-atlas coverage masks), drawn through an orthographic camera.
//! This crate owns the platform + GPU runtime pieces used by applications.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod camera;
pub mod texture;
pub mod text;
pub mod render;
pub mod scene;
