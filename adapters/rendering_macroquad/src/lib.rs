#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Pulse Field.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! Sprite textures come from a TOML manifest. When the manifest or any image
//! fails to load the backend logs a warning and draws primitive shapes instead.

mod sprites;

use std::{
    collections::VecDeque,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Result;
use glam::Vec2;
use macroquad::{
    color::{Color as MacroquadColor, WHITE},
    input::{is_key_down, is_key_pressed, mouse_wheel, KeyCode},
    math::Vec2 as MacroquadVec2,
};
use pulse_field_core::{HeldDirections, NodeKind, PlayerInput, PressedActions, SpriteImage};
use pulse_field_rendering::{
    Color, FrameInput, HudPresentation, Presentation, RenderingBackend, Scene,
    SpritePresentation,
};

use self::sprites::SpriteAtlas;

/// Crank degrees contributed by one mouse-wheel notch.
const CRANK_DEGREES_PER_WHEEL_NOTCH: f32 = 30.0;
/// Crank degrees contributed per frame while a bracket key is held.
const CRANK_DEGREES_PER_KEY_FRAME: f32 = 6.0;
/// Edge length of a sprite in screen units.
const SPRITE_SIZE: f32 = 16.0;
const HUD_FONT_SIZE: f32 = 20.0;

/// Tracks whether the rotational input is stowed.
///
/// The crank starts docked. Each registered toggle flips the state, and crank
/// deltas observed while docked are reported but ignored by the player system.
#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub struct CrankDock {
    docked: bool,
}

impl Default for CrankDock {
    fn default() -> Self {
        Self { docked: true }
    }
}

impl CrankDock {
    /// Records that the dock toggle was pressed this frame.
    pub fn register_toggle(&mut self) {
        self.docked = !self.docked;
        tracing::debug!(docked = self.docked, "crank dock toggled");
    }

    /// Reports whether the crank is currently docked.
    #[must_use]
    pub fn is_docked(&self) -> bool {
        self.docked
    }
}

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the loop.
    quit_requested: bool,
    /// `C` docks or undocks the crank.
    toggle_crank_dock: bool,
    /// `H` toggles the status line.
    toggle_hud: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            toggle_crank_dock: is_key_pressed(KeyCode::C),
            toggle_hud: is_key_pressed(KeyCode::H),
        }
    }
}

/// Raw device readings for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct InputObservations {
    held: HeldDirections,
    primary_pressed: bool,
    secondary_pressed: bool,
    wheel_notches: f32,
    crank_forward_held: bool,
    crank_back_held: bool,
}

impl InputObservations {
    fn poll() -> Self {
        let (_, wheel_y) = mouse_wheel();
        Self {
            held: HeldDirections {
                up: is_key_down(KeyCode::Up),
                down: is_key_down(KeyCode::Down),
                left: is_key_down(KeyCode::Left),
                right: is_key_down(KeyCode::Right),
            },
            primary_pressed: is_key_pressed(KeyCode::Z),
            secondary_pressed: is_key_pressed(KeyCode::X),
            wheel_notches: if wheel_y == 0.0 { 0.0 } else { wheel_y.signum() },
            crank_forward_held: is_key_down(KeyCode::RightBracket),
            crank_back_held: is_key_down(KeyCode::LeftBracket),
        }
    }
}

fn gather_frame_input(observations: InputObservations, dock: CrankDock) -> FrameInput {
    let mut crank_change = observations.wheel_notches * CRANK_DEGREES_PER_WHEEL_NOTCH;
    if observations.crank_forward_held {
        crank_change += CRANK_DEGREES_PER_KEY_FRAME;
    }
    if observations.crank_back_held {
        crank_change -= CRANK_DEGREES_PER_KEY_FRAME;
    }

    FrameInput {
        player: PlayerInput {
            held: observations.held,
            pressed: PressedActions {
                primary: observations.primary_pressed,
                secondary: observations.secondary_pressed,
            },
            crank_change,
            crank_docked: dock.is_docked(),
        },
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    load_sprites: bool,
    manifest_path: PathBuf,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            load_sprites: true,
            manifest_path: PathBuf::from("assets/manifest.toml"),
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame rate metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Configures whether the backend should attempt to load sprite assets.
    #[must_use]
    pub fn with_sprite_loading(mut self, enabled: bool) -> Self {
        self.load_sprites = enabled;
        self
    }

    /// Overrides the location of the sprite manifest.
    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }
}

#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    frame_times: VecDeque<Duration>,
    window_duration: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FpsMetrics {
    per_second: f32,
    trailing_ten_seconds: f32,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second and trailing ten-second averages once
    /// one second has elapsed.
    fn record_frame(&mut self, frame: Duration) -> Option<FpsMetrics> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);

        self.frame_times.push_back(frame);
        self.window_duration += frame;
        let trailing_window = Duration::from_secs(10);
        while self.window_duration > trailing_window {
            let Some(removed) = self.frame_times.pop_front() else {
                break;
            };
            self.window_duration = self.window_duration.saturating_sub(removed);
        }

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let per_second = self.frames as f32 / seconds;
        let window_seconds = self.window_duration.as_secs_f32();
        let trailing_ten_seconds = if window_seconds <= f32::EPSILON {
            per_second
        } else {
            self.frame_times.len() as f32 / window_seconds
        };
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(FpsMetrics {
            per_second,
            trailing_ten_seconds,
        })
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            load_sprites,
            manifest_path,
        } = self;

        let window_size = presentation.window_size();
        let Presentation {
            window_title,
            clear_color,
            scene,
            ..
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: window_size.x.round() as i32,
            window_height: window_size.y.round() as i32,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let sprite_atlas = if load_sprites {
                match SpriteAtlas::from_manifest_path(&manifest_path) {
                    Ok(atlas) => {
                        tracing::info!(textures = atlas.len(), "sprite atlas loaded");
                        Some(atlas)
                    }
                    Err(error) => {
                        tracing::warn!("sprite assets unavailable, drawing primitives: {error:#}");
                        None
                    }
                }
            } else {
                None
            };

            let background = to_macroquad_color(clear_color);
            let started = Instant::now();
            let mut fps_counter = FpsCounter::default();
            let mut crank_dock = CrankDock::default();
            let mut show_hud = true;

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }
                if keyboard.toggle_crank_dock {
                    crank_dock.register_toggle();
                }
                if keyboard.toggle_hud {
                    show_hud = !show_hud;
                }

                let frame_input = gather_frame_input(InputObservations::poll(), crank_dock);
                update_scene(started.elapsed(), frame_input, &mut scene);

                macroquad::window::clear_background(background);
                let metrics = SceneMetrics::from_scene(
                    &scene,
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );
                draw_play_area(&metrics);
                draw_sprites(&scene.sprites, &metrics, sprite_atlas.as_ref());
                if show_hud {
                    if let Some(hud) = scene.hud {
                        draw_hud(hud, crank_dock, &metrics);
                    }
                }

                let frame_time = Duration::from_secs_f32(macroquad::time::get_frame_time().max(0.0));
                if let Some(FpsMetrics {
                    per_second,
                    trailing_ten_seconds,
                }) = fps_counter.record_frame(frame_time)
                {
                    if show_fps {
                        tracing::info!(
                            fps = per_second,
                            trailing_fps = trailing_ten_seconds,
                            "frame rate"
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    width_scaled: f32,
    height_scaled: f32,
}

impl SceneMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        let width = scene.screen.width();
        let height = scene.screen.height();
        let scale = if width <= f32::EPSILON || height <= f32::EPSILON {
            0.0
        } else {
            (screen_width / width).min(screen_height / height)
        };
        let width_scaled = width * scale;
        let height_scaled = height * scale;
        Self {
            scale,
            offset_x: (screen_width - width_scaled) * 0.5,
            offset_y: (screen_height - height_scaled) * 0.5,
            width_scaled,
            height_scaled,
        }
    }

    fn to_screen(&self, position: Vec2) -> MacroquadVec2 {
        MacroquadVec2::new(
            self.offset_x + position.x * self.scale,
            self.offset_y + position.y * self.scale,
        )
    }
}

fn draw_play_area(metrics: &SceneMetrics) {
    let border = to_macroquad_color(Color::from_rgb_u8(70, 70, 90));
    macroquad::shapes::draw_rectangle_lines(
        metrics.offset_x,
        metrics.offset_y,
        metrics.width_scaled,
        metrics.height_scaled,
        2.0,
        border,
    );
}

fn draw_sprites(
    sprites: &[SpritePresentation],
    metrics: &SceneMetrics,
    sprite_atlas: Option<&SpriteAtlas>,
) {
    if metrics.scale <= f32::EPSILON {
        return;
    }

    let size = SPRITE_SIZE * metrics.scale;
    for sprite in sprites {
        let center = metrics.to_screen(sprite.position);
        let drawn = sprite_atlas
            .map(|atlas| atlas.draw(sprite.image, center, size).is_ok())
            .unwrap_or(false);
        if !drawn {
            draw_primitive(sprite.image, center, size);
        }
    }
}

fn draw_primitive(image: SpriteImage, center: MacroquadVec2, size: f32) {
    let half = size * 0.5;
    match image {
        SpriteImage::Player => {
            let thickness = (size * 0.08).max(1.0);
            macroquad::shapes::draw_line(
                center.x - half,
                center.y,
                center.x + half,
                center.y,
                thickness,
                WHITE,
            );
            macroquad::shapes::draw_line(
                center.x,
                center.y - half,
                center.x,
                center.y + half,
                thickness,
                WHITE,
            );
        }
        SpriteImage::Node { kind, frame } => {
            let pulse = 0.6 + 0.4 * (f32::from(frame.get()) / 7.0);
            let color = to_macroquad_color(node_color(kind));
            match kind {
                NodeKind::Strong => {
                    macroquad::shapes::draw_circle(center.x, center.y, half * pulse, color);
                }
                NodeKind::Weak => {
                    let edge = size * pulse * 0.8;
                    macroquad::shapes::draw_rectangle_lines(
                        center.x - edge * 0.5,
                        center.y - edge * 0.5,
                        edge,
                        edge,
                        (size * 0.1).max(1.0),
                        color,
                    );
                }
            }
        }
    }
}

fn node_color(kind: NodeKind) -> Color {
    match kind {
        NodeKind::Strong => Color::from_rgb_u8(240, 180, 90),
        NodeKind::Weak => Color::from_rgb_u8(120, 200, 230),
    }
}

fn hud_text(hud: HudPresentation, dock: CrankDock) -> String {
    let crank = if dock.is_docked() { "docked" } else { "free" };
    format!(
        "velocity {:.2}  nodes {}  field {}  crank {crank}",
        hud.time_velocity, hud.live_nodes, hud.pitch_field
    )
}

fn draw_hud(hud: HudPresentation, dock: CrankDock, metrics: &SceneMetrics) {
    let color = to_macroquad_color(Color::from_rgb_u8(200, 200, 200).lighten(0.2));
    let _ = macroquad::text::draw_text(
        &hud_text(hud, dock),
        metrics.offset_x + 6.0,
        metrics.offset_y + HUD_FONT_SIZE,
        HUD_FONT_SIZE,
        color,
    );
}

fn to_macroquad_color(color: Color) -> MacroquadColor {
    MacroquadColor::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_field_core::Screen;

    fn scene() -> Scene {
        Scene::new(Screen::new(400.0, 240.0), Vec::new(), None)
    }

    #[test]
    fn metrics_letterbox_the_play_area() {
        let metrics = SceneMetrics::from_scene(&scene(), 1000.0, 480.0);
        assert_eq!(metrics.scale, 2.0);
        assert_eq!(metrics.offset_x, 100.0);
        assert_eq!(metrics.offset_y, 0.0);
        assert_eq!(
            metrics.to_screen(Vec2::new(200.0, 120.0)),
            MacroquadVec2::new(500.0, 240.0)
        );
    }

    #[test]
    fn metrics_handle_empty_window() {
        let metrics = SceneMetrics::from_scene(&scene(), 0.0, 0.0);
        assert_eq!(metrics.scale, 0.0);
    }

    #[test]
    fn wheel_and_brackets_combine_into_crank_change() {
        let observations = InputObservations {
            wheel_notches: -1.0,
            crank_forward_held: true,
            ..InputObservations::default()
        };
        let input = gather_frame_input(observations, CrankDock::default());
        assert_eq!(input.player.crank_change, -24.0);
        assert!(input.player.crank_docked);
    }

    #[test]
    fn undocked_crank_is_reported() {
        let mut dock = CrankDock::default();
        dock.register_toggle();
        let observations = InputObservations {
            secondary_pressed: true,
            held: HeldDirections {
                left: true,
                ..HeldDirections::default()
            },
            ..InputObservations::default()
        };
        let input = gather_frame_input(observations, dock);
        assert!(!input.player.crank_docked);
        assert!(input.player.pressed.secondary);
        assert!(input.player.held.left);
        assert_eq!(input.player.crank_change, 0.0);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        let frame = Duration::from_millis(250);
        assert_eq!(counter.record_frame(frame), None);
        assert_eq!(counter.record_frame(frame), None);
        assert_eq!(counter.record_frame(frame), None);
        let metrics = counter.record_frame(frame).expect("one second elapsed");
        assert!((metrics.per_second - 4.0).abs() < 1e-4);
        assert!((metrics.trailing_ten_seconds - 4.0).abs() < 1e-4);
        assert_eq!(counter.record_frame(frame), None);
    }

    #[test]
    fn hud_text_reports_engine_state() {
        let hud = HudPresentation {
            time_velocity: 1.5,
            live_nodes: 4,
            pitch_field: 2,
        };
        assert_eq!(
            hud_text(hud, CrankDock::default()),
            "velocity 1.50  nodes 4  field 2  crank docked"
        );
    }
}
