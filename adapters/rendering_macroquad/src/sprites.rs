use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use macroquad::{
    color::WHITE,
    math::Vec2 as MacroquadVec2,
    texture::{self, DrawTextureParams, Texture2D},
};
use pulse_field_core::{AnimFrame, NodeKind, SpriteImage};

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Every image the manifest must provide, in load order.
pub(crate) fn all_sprite_images() -> Vec<SpriteImage> {
    let mut images = vec![SpriteImage::Player];
    for kind in NodeKind::ALL {
        let mut frame = AnimFrame::FIRST;
        for _ in 0..AnimFrame::COUNT {
            images.push(SpriteImage::Node { kind, frame });
            frame = frame.next();
        }
    }
    images
}

/// Cache of textures loaded from the sprite manifest.
#[derive(Debug)]
pub(crate) struct SpriteAtlas {
    textures: HashMap<SpriteImage, Texture2D>,
}

impl SpriteAtlas {
    /// Loads sprites from the manifest located at the provided path.
    pub(crate) fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_manifest_with_loader(path, default_loader)
    }

    /// Draws the image centred on `center` with the provided edge length in pixels.
    pub(crate) fn draw(&self, image: SpriteImage, center: MacroquadVec2, size: f32) -> Result<()> {
        let texture = *self
            .textures
            .get(&image)
            .with_context(|| format!("sprite {image:?} missing from atlas"))?;

        let dest_size = MacroquadVec2::new(size, size);
        texture::draw_texture_ex(
            texture,
            center.x - size * 0.5,
            center.y - size * 0.5,
            WHITE,
            DrawTextureParams {
                dest_size: Some(dest_size),
                ..DrawTextureParams::default()
            },
        );
        Ok(())
    }

    /// Number of textures stored in the atlas.
    pub(crate) fn len(&self) -> usize {
        self.textures.len()
    }

    fn from_manifest_with_loader(
        path: impl AsRef<Path>,
        mut loader: impl FnMut(SpriteImage, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read sprite manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let entries = parse_manifest(&contents, &base)?;
        Self::from_entries(entries, &mut loader)
    }

    fn from_entries(
        entries: Vec<(SpriteImage, PathBuf)>,
        loader: &mut impl FnMut(SpriteImage, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let mut textures = HashMap::with_capacity(entries.len());
        for (image, path) in entries {
            let texture = loader(image, &path).with_context(|| {
                format!("failed to load sprite {image:?} from {}", path.display())
            })?;
            if textures.insert(image, texture).is_some() {
                bail!("duplicate sprite entry for {image:?}");
            }
        }
        Ok(Self { textures })
    }
}

fn default_loader(_image: SpriteImage, path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read sprite asset at {}", path.display()))?;
    Ok(Texture2D::from_file_with_format(&bytes, None))
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    version: u32,
    sprites: HashMap<String, String>,
}

fn parse_manifest(contents: &str, base_path: &Path) -> Result<Vec<(SpriteImage, PathBuf)>> {
    let manifest: Manifest =
        toml::from_str(contents).context("failed to parse sprite manifest toml contents")?;
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        bail!(
            "unsupported sprite manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_MANIFEST_VERSION
        );
    }

    let mut resolved = HashMap::new();
    for (name, relative_path) in manifest.sprites {
        let image = parse_sprite_name(&name)
            .with_context(|| format!("unknown sprite key `{name}` in manifest"))?;
        if resolved.insert(image, base_path.join(relative_path)).is_some() {
            bail!("sprite manifest contains duplicate entry for {image:?}");
        }
    }

    let expected = all_sprite_images();
    let mut ordered = Vec::with_capacity(expected.len());
    for image in expected {
        let Some(path) = resolved.remove(&image) else {
            bail!("sprite manifest missing entry for {image:?}");
        };
        ordered.push((image, path));
    }

    Ok(ordered)
}

/// Parses `Player`, `Strong1`..`Strong8` and `Weak1`..`Weak8`.
fn parse_sprite_name(name: &str) -> Result<SpriteImage> {
    if name == "Player" {
        return Ok(SpriteImage::Player);
    }
    let (kind, number) = if let Some(number) = name.strip_prefix("Strong") {
        (NodeKind::Strong, number)
    } else if let Some(number) = name.strip_prefix("Weak") {
        (NodeKind::Weak, number)
    } else {
        bail!("unknown sprite key `{name}`");
    };
    let number: u8 = number
        .parse()
        .with_context(|| format!("sprite key `{name}` has no frame number"))?;
    if !(1..=AnimFrame::COUNT).contains(&number) {
        bail!("frame {number} of `{name}` is outside 1..={}", AnimFrame::COUNT);
    }
    Ok(SpriteImage::Node {
        kind,
        frame: AnimFrame::new(number - 1),
    })
}
