#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots Pulse Field.

mod simulation;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_field_rendering::{Color, Presentation, RenderingBackend, Scene};
use pulse_field_rendering_macroquad::MacroquadBackend;
use pulse_field_world::Config;
use tracing_subscriber::EnvFilter;

use self::simulation::{run_headless, Simulation};

/// Window pixels per screen unit.
const PIXEL_SCALE: f32 = 2.0;

/// Generative sound toy driven by wandering nodes.
#[derive(Debug, Parser)]
#[command(name = "pulse-field", version, long_about = None)]
struct Cli {
    /// TOML file overriding the default engine configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the engine's random number generator.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Synchronise presentation with the display refresh rate.
    #[arg(long)]
    vsync: bool,

    /// Log frame rate metrics once per second.
    #[arg(long)]
    show_fps: bool,

    /// Skip loading sprite assets and draw primitive shapes.
    #[arg(long)]
    no_sprites: bool,

    /// Directory containing `manifest.toml` and the sprite images.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run a scripted session without a window and print a summary.
    Headless {
        /// Number of frames to simulate.
        #[arg(long, default_value_t = 1_800)]
        frames: u64,

        /// Frames between scripted spawn presses; zero disables spawning.
        #[arg(long, default_value_t = 20)]
        spawn_every: u64,
    },
}

/// Entry point for the Pulse Field command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::info!(
        seed = config.seed,
        capacity = config.capacity,
        sample_rate = config.sample_rate,
        "engine configured"
    );

    match cli.command {
        Some(Mode::Headless {
            frames,
            spawn_every,
        }) => {
            let summary = run_headless(config, frames, spawn_every)
                .context("failed to start headless session")?;
            println!("{summary}");
            Ok(())
        }
        None => run_window(&cli, config),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            Config::from_toml_str(&contents)
                .with_context(|| format!("invalid config at {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn run_window(cli: &Cli, config: Config) -> Result<()> {
    let mut simulation = Simulation::new(config).context("failed to start engine")?;
    let scene = Scene::new(simulation.screen(), Vec::new(), Some(simulation.hud()));
    let presentation = Presentation::new(
        "Pulse Field",
        Color::from_rgb_u8(14, 14, 22),
        PIXEL_SCALE,
        scene,
    )?;

    let backend = MacroquadBackend::new()
        .with_vsync(cli.vsync)
        .with_show_fps(cli.show_fps)
        .with_sprite_loading(!cli.no_sprites)
        .with_manifest_path(cli.assets.join("manifest.toml"));

    backend.run(presentation, move |elapsed, input, scene| {
        simulation.step(elapsed, &input.player);
        simulation.populate_scene(scene);
    })
}
