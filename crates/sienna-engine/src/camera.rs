//! Orthographic 2D camera.
//!
//! Screen space is logical pixels, origin top-left, +Y down. The camera
//! produces the per-draw `transform` matrix consumed by both renderers:
//! `transform = projection * view` (sprite draws append their own model
//! matrix on top).

use nalgebra::{Matrix4, Orthographic3, Vector3};

use crate::coords::Vec2;

/// Orthographic camera with pan, per-axis zoom, and rotation about the
/// screen center.
///
/// The default state (`position = 0`, `zoom = 1`, `rotation = 0`) yields an
/// identity view, so `transform()` is the plain screen-space projection,
/// which suits UI text overlays.
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Orthographic3<f32>,
    screen: Vec2,
    position: Vec2,
    zoom: Vec2,
    rotation: f32,
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            projection: Orthographic3::new(0.0, width, height, 0.0, -1.0, 1.0),
            screen: Vec2::new(width, height),
            position: Vec2::zero(),
            zoom: Vec2::splat(1.0),
            rotation: 0.0,
        }
    }

    /// The view matrix: pan, then rotate and zoom about the screen center.
    ///
    /// A world point at `position + screen/2` always lands on the screen
    /// center, independent of zoom and rotation.
    pub fn view(&self) -> Matrix4<f32> {
        let center = Vector3::new(self.screen.x / 2.0, self.screen.y / 2.0, 0.0);

        Matrix4::new_translation(&center)
            * Matrix4::new_nonuniform_scaling(&Vector3::new(self.zoom.x, self.zoom.y, 1.0))
            * Matrix4::new_rotation(Vector3::z() * self.rotation)
            * Matrix4::new_translation(&-center)
            * Matrix4::new_translation(&Vector3::new(-self.position.x, -self.position.y, 0.0))
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        self.projection.as_matrix()
    }

    /// The combined per-draw transform (`projection * view`).
    pub fn transform(&self) -> Matrix4<f32> {
        self.projection.as_matrix() * self.view()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Pans so that the world point `center` lands on the screen center.
    pub fn look_at(&mut self, center: Vec2) {
        self.position = center - self.screen / 2.0;
    }

    pub fn set_zoom(&mut self, zoom: Vec2) {
        self.zoom = zoom;
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    /// Updates the screen size, rebuilding the projection.
    ///
    /// Call on window resize so logical pixels keep mapping 1:1.
    pub fn set_screen(&mut self, width: f32, height: f32) {
        self.screen = Vec2::new(width, height);
        self.projection = Orthographic3::new(0.0, width, height, 0.0, -1.0, 1.0);
    }

    pub fn screen(&self) -> Vec2 {
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn assert_approx(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    fn assert_clip(m: &Matrix4<f32>, p: (f32, f32), want: (f32, f32)) {
        let v = m * Vector4::new(p.0, p.1, 0.0, 1.0);
        assert_approx(v.x, want.0);
        assert_approx(v.y, want.1);
    }

    // ── view ──────────────────────────────────────────────────────────────

    #[test]
    fn default_view_is_identity() {
        let cam = Camera::new(1280.0, 720.0);
        assert_eq!(cam.view(), Matrix4::identity());
    }

    #[test]
    fn pan_shifts_world_points() {
        let mut cam = Camera::new(100.0, 100.0);
        cam.set_position(Vec2::new(10.0, -5.0));
        let v = cam.view() * Vector4::new(10.0, -5.0, 0.0, 1.0);
        assert_approx(v.x, 0.0);
        assert_approx(v.y, 0.0);
    }

    #[test]
    fn zoom_scales_about_screen_center() {
        let mut cam = Camera::new(100.0, 100.0);
        cam.set_zoom(Vec2::splat(2.0));

        // The center is a fixed point; offsets from it double.
        let center = cam.view() * Vector4::new(50.0, 50.0, 0.0, 1.0);
        assert_approx(center.x, 50.0);
        assert_approx(center.y, 50.0);

        let off = cam.view() * Vector4::new(60.0, 50.0, 0.0, 1.0);
        assert_approx(off.x, 70.0);
        assert_approx(off.y, 50.0);
    }

    #[test]
    fn look_at_centers_the_target() {
        let mut cam = Camera::new(200.0, 100.0);
        cam.look_at(Vec2::new(500.0, -40.0));
        let v = cam.view() * Vector4::new(500.0, -40.0, 0.0, 1.0);
        assert_approx(v.x, 100.0);
        assert_approx(v.y, 50.0);
    }

    #[test]
    fn tracked_point_lands_on_screen_center() {
        let mut cam = Camera::new(200.0, 100.0);
        cam.set_position(Vec2::new(30.0, 40.0));
        cam.set_zoom(Vec2::splat(3.0));
        cam.set_rotation(0.7);

        let v = cam.view() * Vector4::new(30.0 + 100.0, 40.0 + 50.0, 0.0, 1.0);
        assert_approx(v.x, 100.0);
        assert_approx(v.y, 50.0);
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn projection_maps_screen_corners_to_ndc() {
        let cam = Camera::new(100.0, 50.0);
        let m = cam.transform();

        // Top-left → (-1, +1), bottom-right → (+1, -1): +Y down in logical px.
        assert_clip(&m, (0.0, 0.0), (-1.0, 1.0));
        assert_clip(&m, (100.0, 50.0), (1.0, -1.0));
        assert_clip(&m, (50.0, 25.0), (0.0, 0.0));
    }

    #[test]
    fn set_screen_rebuilds_projection() {
        let mut cam = Camera::new(100.0, 100.0);
        cam.set_screen(200.0, 100.0);
        assert_clip(&cam.transform(), (200.0, 0.0), (1.0, 1.0));
    }
}
