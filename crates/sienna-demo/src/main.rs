//! Sprite + text demo: two animated sprites tracked by the camera, with a
//! screen-space text overlay.
//!
//! Escape or closing the window exits.

use anyhow::Result;

use sienna_engine::camera::Camera;
use sienna_engine::coords::Vec2;
use sienna_engine::core::{App, AppControl, FrameCtx};
use sienna_engine::device::GpuInit;
use sienna_engine::logging::{init_logging, LoggingConfig};
use sienna_engine::paint::Color;
use sienna_engine::render::{SpriteRenderer, TextRenderer};
use sienna_engine::scene::{DrawList, ZIndex};
use sienna_engine::text::{FontId, FontSystem};
use sienna_engine::texture::{TextureId, TextureStore};
use sienna_engine::window::{Runtime, RuntimeConfig};

use winit::event::WindowEvent;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

const ORBIT_RADIUS: f32 = 220.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "sienna demo".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        DemoApp::new(),
    )
}

/// GPU-resident assets, created on the first frame (the device does not
/// exist before the runtime opens the window).
struct Assets {
    checker: TextureId,
    disc: TextureId,
    font: Option<FontId>,
}

struct DemoApp {
    sprite_renderer: SpriteRenderer,
    text_renderer: TextRenderer,
    textures: TextureStore,
    fonts: FontSystem,
    draw_list: DrawList,
    camera: Camera,

    assets: Option<Assets>,
    spin: f32,
    orbit: f32,
}

impl DemoApp {
    fn new() -> Self {
        Self {
            sprite_renderer: SpriteRenderer::new(),
            text_renderer: TextRenderer::new(),
            textures: TextureStore::new(),
            fonts: FontSystem::new(),
            draw_list: DrawList::new(),
            camera: Camera::new(1280.0, 720.0),
            assets: None,
            spin: 0.0,
            orbit: 0.0,
        }
    }

    fn ensure_assets(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.assets.is_some() {
            return;
        }

        let checker = self
            .textures
            .from_rgba8(device, queue, &checkerboard_rgba(64, 8), 64, 64)
            .expect("checkerboard pixel buffer is well-formed");
        let disc = self
            .textures
            .from_rgba8(device, queue, &soft_disc_rgba(64), 64, 64)
            .expect("disc pixel buffer is well-formed");

        let font = match load_system_font() {
            Some(bytes) => match self.fonts.load_font(&bytes) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("failed to parse system font: {e}");
                    None
                }
            },
            None => {
                log::warn!("no system font found; text overlay disabled");
                None
            }
        };

        self.assets = Some(Assets { checker, disc, font });
    }
}

impl App for DemoApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.state.is_pressed()
                && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
            {
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.ensure_assets(ctx.gpu.device(), ctx.gpu.queue());
        let Some(assets) = &self.assets else {
            return AppControl::Continue;
        };

        let (w, h) = ctx.window.logical_size();
        let dt = ctx.time.dt;

        self.spin += dt * 0.8;
        self.orbit += dt * 0.4;

        // A big slowly-spinning backdrop sprite and a small one orbiting it.
        let center = Vec2::new(0.0, 0.0);
        let orbiter = center
            + Vec2::new(
                self.orbit.cos() * ORBIT_RADIUS,
                self.orbit.sin() * ORBIT_RADIUS,
            );

        self.camera.set_screen(w, h);
        self.camera.look_at(center);

        self.draw_list.clear();
        self.draw_list.push_sprite(
            ZIndex::new(0),
            assets.checker,
            center - Vec2::splat(160.0),
            Vec2::splat(320.0),
            -self.spin * 0.25,
            Color::rgb(0.9, 0.85, 0.8),
        );
        self.draw_list.push_sprite(
            ZIndex::new(1),
            assets.disc,
            orbiter - Vec2::splat(48.0),
            Vec2::splat(96.0),
            self.spin,
            Color::rgb(0.95, 0.45, 0.25),
        );

        let mut ui_list = DrawList::new();
        if let Some(font) = assets.font {
            let label = "sienna sprite & text demo";
            let size = 22.0;
            let measured = self.fonts.measure_text(label, font, size, None);
            ui_list.push_text(
                ZIndex::new(0),
                label,
                font,
                size,
                Color::rgb(0.95, 0.95, 0.9),
                Vec2::new((w - measured.x) / 2.0, 16.0),
                None,
            );
        }
        // Screen-space camera for the overlay: identity view.
        let ui_camera = Camera::new(w, h);

        let sprite_renderer = &mut self.sprite_renderer;
        let text_renderer = &mut self.text_renderer;
        let draw_list = &mut self.draw_list;
        let textures = &self.textures;
        let fonts = &self.fonts;
        let camera = &self.camera;

        ctx.render(Color::rgb(0.12, 0.1, 0.14), |rctx, target| {
            sprite_renderer.render(rctx, target, draw_list, textures, camera);
            text_renderer.render(rctx, target, &mut ui_list, fonts, &ui_camera);
        })
    }
}

// ── procedural textures ───────────────────────────────────────────────────

/// Opaque two-tone checkerboard, `cell` pixels per square.
fn checkerboard_rgba(size: u32, cell: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if light { 220 } else { 70 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

/// White disc with a soft alpha edge, for showing texture-driven alpha.
fn soft_disc_rgba(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    let half = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - half;
            let dy = y as f32 + 0.5 - half;
            let d = (dx * dx + dy * dy).sqrt() / half;
            let a = ((1.0 - d) * 4.0).clamp(0.0, 1.0);
            pixels.extend_from_slice(&[255, 255, 255, (a * 255.0) as u8]);
        }
    }
    pixels
}

// ── font discovery ────────────────────────────────────────────────────────

/// Probes a few well-known system font locations.
fn load_system_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\segoeui.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}
