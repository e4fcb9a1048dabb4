#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Pulse Field adapters.
//!
//! The engine talks to sprites through [`SpriteStage`], an in-memory display
//! list implementing the core sprite service. Every `render_all` call
//! publishes the visible sprites, which adapters copy into the [`Scene`]
//! handed to a [`RenderingBackend`].

use std::{collections::BTreeMap, error::Error, fmt, time::Duration};

use anyhow::Result as AnyResult;
use glam::Vec2;
use pulse_field_core::{PlayerInput, Screen, SpriteHandle, SpriteImage, SpriteService};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Player controls sampled for this frame.
    pub player: PlayerInput,
}

/// Sprite drawn in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpritePresentation {
    /// Handle of the sprite in the display list.
    pub handle: SpriteHandle,
    /// Image displayed by the sprite.
    pub image: SpriteImage,
    /// Screen position of the sprite's centre.
    pub position: Vec2,
}

/// Status line drawn over the play area.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct HudPresentation {
    /// Current time velocity.
    pub time_velocity: f32,
    /// Number of live nodes.
    pub live_nodes: usize,
    /// Index of the active pitch field.
    pub pitch_field: usize,
}

/// Scene description combining the play area and its sprites.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Extent of the play area in screen units.
    pub screen: Screen,
    /// Visible sprites in draw order.
    pub sprites: Vec<SpritePresentation>,
    /// Optional status line.
    pub hud: Option<HudPresentation>,
}

impl Scene {
    /// Creates a new scene descriptor.
    #[must_use]
    pub fn new(screen: Screen, sprites: Vec<SpritePresentation>, hud: Option<HudPresentation>) -> Self {
        Self {
            screen,
            sprites,
            hud,
        }
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Window pixels per screen unit.
    pub pixel_scale: f32,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    ///
    /// Returns an error when `pixel_scale` is not a positive finite number.
    pub fn new<T>(
        window_title: T,
        clear_color: Color,
        pixel_scale: f32,
        scene: Scene,
    ) -> Result<Self, RenderingError>
    where
        T: Into<String>,
    {
        if !(pixel_scale.is_finite() && pixel_scale > 0.0) {
            return Err(RenderingError::InvalidPixelScale { pixel_scale });
        }

        Ok(Self {
            window_title: window_title.into(),
            clear_color,
            pixel_scale,
            scene,
        })
    }

    /// Window size in pixels needed to show the whole play area.
    #[must_use]
    pub fn window_size(&self) -> Vec2 {
        Vec2::new(
            self.scene.screen.width() * self.pixel_scale,
            self.scene.screen.height() * self.pixel_scale,
        )
    }
}

/// Rendering backend capable of presenting Pulse Field scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the monotonic time elapsed
    /// since the backend started, per-frame input captured by the adapter, and
    /// may mutate the scene before it is rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Pixel scale must be positive to produce a visible window.
    InvalidPixelScale {
        /// Provided scale that failed validation.
        pixel_scale: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPixelScale { pixel_scale } => {
                write!(f, "pixel_scale must be positive (received {pixel_scale})")
            }
        }
    }
}

impl Error for RenderingError {}

/// Recorded state of a sprite in the display list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteState {
    /// Image displayed by the sprite.
    pub image: SpriteImage,
    /// Screen position of the sprite's centre.
    pub position: Vec2,
    /// Whether the sprite is part of the scene.
    pub visible: bool,
}

/// In-memory sprite service that publishes its visible sprites on `render_all`.
#[derive(Debug, Default)]
pub struct SpriteStage {
    next_id: u32,
    sprites: BTreeMap<SpriteHandle, SpriteState>,
    draw_order: Vec<SpriteHandle>,
    frame: Vec<SpritePresentation>,
    frames_rendered: u64,
}

impl SpriteStage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sprites that have not been destroyed.
    #[must_use]
    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Number of sprites currently in the scene.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.draw_order.len()
    }

    /// Recorded state of a sprite.
    #[must_use]
    pub fn sprite(&self, sprite: SpriteHandle) -> Option<&SpriteState> {
        self.sprites.get(&sprite)
    }

    /// Sprites published by the most recent `render_all` call.
    #[must_use]
    pub fn frame(&self) -> &[SpritePresentation] {
        &self.frame
    }

    /// Number of `render_all` calls so far.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn state_mut(&mut self, sprite: SpriteHandle) -> Option<&mut SpriteState> {
        let state = self.sprites.get_mut(&sprite);
        if state.is_none() {
            tracing::warn!(sprite = sprite.get(), "request for unknown sprite");
        }
        state
    }
}

impl SpriteService for SpriteStage {
    fn create_sprite(&mut self, image: SpriteImage) -> SpriteHandle {
        let handle = SpriteHandle::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self.sprites.insert(
            handle,
            SpriteState {
                image,
                position: Vec2::ZERO,
                visible: false,
            },
        );
        handle
    }

    fn move_to(&mut self, sprite: SpriteHandle, position: Vec2) {
        if let Some(state) = self.state_mut(sprite) {
            state.position = position;
        }
    }

    fn set_image(&mut self, sprite: SpriteHandle, image: SpriteImage) {
        if let Some(state) = self.state_mut(sprite) {
            state.image = image;
        }
    }

    fn add_to_scene(&mut self, sprite: SpriteHandle) {
        let newly_visible = match self.state_mut(sprite) {
            Some(state) if !state.visible => {
                state.visible = true;
                true
            }
            _ => false,
        };
        if newly_visible {
            self.draw_order.push(sprite);
        }
    }

    fn remove_from_scene(&mut self, sprite: SpriteHandle) {
        if let Some(state) = self.state_mut(sprite) {
            state.visible = false;
        }
        self.draw_order.retain(|handle| *handle != sprite);
    }

    fn destroy_sprite(&mut self, sprite: SpriteHandle) {
        if self.sprites.remove(&sprite).is_none() {
            tracing::warn!(sprite = sprite.get(), "destroying unknown sprite");
        }
        self.draw_order.retain(|handle| *handle != sprite);
    }

    fn render_all(&mut self) {
        let sprites = &self.sprites;
        self.frame = self
            .draw_order
            .iter()
            .filter_map(|handle| {
                sprites.get(handle).map(|state| SpritePresentation {
                    handle: *handle,
                    image: state.image,
                    position: state.position,
                })
            })
            .collect();
        self.frames_rendered += 1;
    }
}
