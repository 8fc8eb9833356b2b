//! Coordinate types shared across renderers and applications.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! The camera converts logical-pixel geometry to clip space; see
//! [`crate::camera::Camera`].

mod vec2;

pub use vec2::Vec2;
