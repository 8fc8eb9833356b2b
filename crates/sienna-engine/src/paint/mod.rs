//! Color types for draw commands.

mod color;

pub use color::Color;
