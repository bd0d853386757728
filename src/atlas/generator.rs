//! Atlas rasterization - turns a computed layout into pixels and a frame map.

use super::error::PackingError;
use super::geometry::Rectangle;
use super::layout::{AtlasConfig, AtlasLayout, AtlasLayoutEngine, UnitSpec};
use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Worker atlases are always 8 directions x 8 walking frames.
pub const WORKER_DIRECTIONS: u32 = 8;
pub const WORKER_FRAMES_PER_DIRECTION: u32 = 8;
pub const WORKER_FRAME_SIZE: (u32, u32) = (64, 64);
/// Canonical worker atlas dimensions.
pub const WORKER_ATLAS_SIZE: (u32, u32) = (512, 512);

/// Transparent color for atlas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A frame's position and size within an atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl From<Rectangle> for FrameRect {
    fn from(rect: Rectangle) -> Self {
        Self { x: rect.x, y: rect.y, w: rect.width, h: rect.height }
    }
}

impl From<FrameRect> for Rectangle {
    fn from(frame: FrameRect) -> Self {
        Rectangle::new(frame.x, frame.y, frame.w, frame.h)
    }
}

/// A named sprite to be packed into an atlas
#[derive(Debug, Clone)]
pub struct SpriteInput {
    pub name: String,
    pub image: RgbaImage,
}

impl SpriteInput {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self { name: name.into(), image }
    }
}

/// Sidecar description file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidecarFormat {
    #[default]
    Json,
    Toml,
}

impl SidecarFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SidecarFormat::Json => "json",
            SidecarFormat::Toml => "toml",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(|e| e.parse().ok())
    }
}

impl FromStr for SidecarFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SidecarFormat::Json),
            "toml" => Ok(SidecarFormat::Toml),
            other => Err(format!("unknown sidecar format '{}'", other)),
        }
    }
}

/// Atlas dimensions as written to the sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarSize {
    pub w: u32,
    pub h: u32,
}

/// `meta` section of the sidecar file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarMeta {
    pub size: SidecarSize,
    pub format: String,
    pub scale: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// On-disk description of an atlas image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasSidecar {
    pub frames: BTreeMap<String, FrameRect>,
    pub meta: SidecarMeta,
}

impl AtlasSidecar {
    /// Load a sidecar, choosing the parser by file extension.
    pub fn load(path: &Path) -> Result<Self, PackingError> {
        let contents = fs::read_to_string(path)?;
        match SidecarFormat::from_path(path).unwrap_or_default() {
            SidecarFormat::Json => Ok(serde_json::from_str(&contents)?),
            SidecarFormat::Toml => Ok(toml::from_str(&contents)?),
        }
    }

    pub fn save(&self, path: &Path, format: SidecarFormat) -> Result<(), PackingError> {
        let contents = match format {
            SidecarFormat::Json => serde_json::to_string_pretty(self)?,
            SidecarFormat::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Paths written by [`AtlasResult::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAtlas {
    pub image: PathBuf,
    pub sidecar: PathBuf,
}

impl SavedAtlas {
    pub fn paths(&self) -> [&Path; 2] {
        [&self.image, &self.sidecar]
    }
}

/// Result of atlas generation
#[derive(Debug, Clone)]
pub struct AtlasResult {
    pub atlas: RgbaImage,
    pub frame_map: BTreeMap<String, FrameRect>,
    pub metadata: BTreeMap<String, Value>,
}

impl AtlasResult {
    pub fn width(&self) -> u32 {
        self.atlas.width()
    }

    pub fn height(&self) -> u32 {
        self.atlas.height()
    }

    pub fn sidecar(&self, format: &str) -> AtlasSidecar {
        AtlasSidecar {
            frames: self.frame_map.clone(),
            meta: SidecarMeta {
                size: SidecarSize { w: self.width(), h: self.height() },
                format: format.to_string(),
                scale: 1,
                extra: self.metadata.clone(),
            },
        }
    }

    /// Write `<name>.png` and `<name>.<json|toml>` into `dir`.
    pub fn save(
        &self,
        dir: &Path,
        name: &str,
        pixel_format: &str,
        sidecar_format: SidecarFormat,
    ) -> Result<SavedAtlas, PackingError> {
        fs::create_dir_all(dir)?;
        let image = dir.join(format!("{}.png", name));
        let sidecar = dir.join(format!("{}.{}", name, sidecar_format.extension()));

        self.atlas.save(&image)?;
        self.sidecar(pixel_format).save(&sidecar, sidecar_format)?;

        Ok(SavedAtlas { image, sidecar })
    }
}

/// Generates texture atlases for unit animations and sprite collections.
#[derive(Debug, Clone, Default)]
pub struct AtlasGenerator {
    config: AtlasConfig,
    layout_engine: AtlasLayoutEngine,
}

impl AtlasGenerator {
    pub fn new(config: AtlasConfig) -> Self {
        let layout_engine = AtlasLayoutEngine::new(config.clone());
        Self { config, layout_engine }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Build a grid atlas for an animated unit.
    ///
    /// Frames are expected in row-major order: all frames of the first
    /// direction, then the second, and so on.
    pub fn create_unit_atlas(
        &self,
        frames: &[RgbaImage],
        spec: &UnitSpec,
    ) -> Result<AtlasResult, PackingError> {
        if frames.len() != spec.total_frames() {
            return Err(PackingError::FrameCount {
                expected: spec.total_frames(),
                actual: frames.len(),
            });
        }
        check_frame_sizes(frames, spec.frame_size)?;

        let layout = self.layout_engine.calculate_grid_layout(spec);
        self.check_max_size(&layout)?;

        let named: Vec<(String, &RgbaImage)> = spec.frame_names().into_iter().zip(frames).collect();
        let (atlas, frame_map) = rasterize(&layout, named);

        let mut metadata = BTreeMap::new();
        metadata.insert("unit_name".to_string(), json!(spec.name));
        metadata.insert("directions".to_string(), json!(spec.directions));
        metadata.insert("frames_per_direction".to_string(), json!(spec.frames_per_direction));
        metadata.insert("frame_size".to_string(), json!([spec.frame_size.0, spec.frame_size.1]));
        metadata.insert("layout_efficiency".to_string(), json!(layout.efficiency));

        tracing::debug!(
            unit = %spec.name,
            width = atlas.width(),
            height = atlas.height(),
            "created unit atlas"
        );
        Ok(AtlasResult { atlas, frame_map, metadata })
    }

    /// Pack a heterogeneous sprite collection.
    pub fn create_sprite_atlas(&self, sprites: &[SpriteInput]) -> Result<AtlasResult, PackingError> {
        if sprites.is_empty() {
            return Err(PackingError::EmptyInput);
        }

        let mut lookup: BTreeMap<&str, &RgbaImage> = BTreeMap::new();
        for sprite in sprites {
            if lookup.insert(sprite.name.as_str(), &sprite.image).is_some() {
                return Err(PackingError::DuplicateName(sprite.name.clone()));
            }
        }

        let items: Vec<(String, u32, u32)> = sprites
            .iter()
            .map(|s| (s.name.clone(), s.image.width(), s.image.height()))
            .collect();

        let layout = self.layout_engine.calculate_packed_layout(&items)?;
        let layout = self.layout_engine.optimize_atlas_size(&layout);
        self.check_max_size(&layout)?;

        let named: Vec<(String, &RgbaImage)> = layout
            .positions
            .keys()
            .filter_map(|name| lookup.get(name.as_str()).map(|img| (name.clone(), *img)))
            .collect();
        let (atlas, frame_map) = rasterize(&layout, named);

        let mut metadata = BTreeMap::new();
        metadata.insert("sprite_count".to_string(), json!(sprites.len()));
        metadata.insert("layout_efficiency".to_string(), json!(layout.efficiency));

        Ok(AtlasResult { atlas, frame_map, metadata })
    }

    /// Build the canonical 512x512 worker walking atlas.
    ///
    /// Requires exactly 64 frames of 64x64. The grid is laid out without
    /// padding so every frame lands inside the fixed canvas.
    pub fn create_worker_atlas(
        &self,
        frames: &[RgbaImage],
        worker_name: &str,
    ) -> Result<AtlasResult, PackingError> {
        let spec = UnitSpec::new(
            worker_name,
            WORKER_DIRECTIONS,
            WORKER_FRAMES_PER_DIRECTION,
            WORKER_FRAME_SIZE,
        );

        if frames.len() != spec.total_frames() {
            return Err(PackingError::FrameCount {
                expected: spec.total_frames(),
                actual: frames.len(),
            });
        }
        check_frame_sizes(frames, WORKER_FRAME_SIZE)?;

        let grid = AtlasGenerator::new(AtlasConfig {
            padding: 0,
            max_size: (
                self.config.max_size.0.max(WORKER_ATLAS_SIZE.0),
                self.config.max_size.1.max(WORKER_ATLAS_SIZE.1),
            ),
            ..self.config.clone()
        });
        let mut result = grid.create_unit_atlas(frames, &spec)?;

        if result.atlas.dimensions() != WORKER_ATLAS_SIZE {
            let mut canvas =
                RgbaImage::from_pixel(WORKER_ATLAS_SIZE.0, WORKER_ATLAS_SIZE.1, TRANSPARENT);
            imageops::replace(&mut canvas, &result.atlas, 0, 0);
            result.atlas = canvas;
        }

        result.metadata.insert("atlas_type".to_string(), json!("worker_animation"));
        result
            .metadata
            .insert("target_size".to_string(), json!([WORKER_ATLAS_SIZE.0, WORKER_ATLAS_SIZE.1]));
        result.metadata.insert("frame_layout".to_string(), json!("8x8_grid"));
        result.metadata.insert("animation_type".to_string(), json!("walking"));

        Ok(result)
    }

    /// Re-check layout bounds before allocating the canvas.
    fn check_max_size(&self, layout: &AtlasLayout) -> Result<(), PackingError> {
        let (max_w, max_h) = self.config.max_size;
        if layout.width > max_w || layout.height > max_h {
            return Err(PackingError::ExceedsMaxSize {
                width: layout.width,
                height: layout.height,
                max: self.config.max_size,
            });
        }
        Ok(())
    }
}

fn check_frame_sizes(frames: &[RgbaImage], expected: (u32, u32)) -> Result<(), PackingError> {
    for (index, frame) in frames.iter().enumerate() {
        if frame.dimensions() != expected {
            return Err(PackingError::FrameSize { index, expected, actual: frame.dimensions() });
        }
    }
    Ok(())
}

/// Paste every named image at its layout position on a transparent canvas.
///
/// Names missing from the layout are left out, which is how an
/// `OverflowPolicy::EmptyLayout` result rasterizes to an empty atlas.
fn rasterize(
    layout: &AtlasLayout,
    images: Vec<(String, &RgbaImage)>,
) -> (RgbaImage, BTreeMap<String, FrameRect>) {
    let mut atlas = RgbaImage::from_pixel(layout.width.max(1), layout.height.max(1), TRANSPARENT);
    let mut frame_map = BTreeMap::new();

    for (name, image) in images {
        let Some(rect) = layout.positions.get(&name) else {
            continue;
        };
        paste(&mut atlas, image, rect.x, rect.y);
        frame_map.insert(name, FrameRect::from(*rect));
    }

    (atlas, frame_map)
}

/// Alpha-composite when the source has transparency, plain copy otherwise.
fn paste(atlas: &mut RgbaImage, image: &RgbaImage, x: u32, y: u32) {
    if has_transparency(image) {
        imageops::overlay(atlas, image, i64::from(x), i64::from(y));
    } else {
        imageops::replace(atlas, image, i64::from(x), i64::from(y));
    }
}

pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p.0[3] < 255)
}

/// Generate bordered placeholder frames for missing animation frames.
pub fn generate_placeholder_frames(count: usize, frame_size: (u32, u32)) -> Vec<RgbaImage> {
    const BORDER: Rgba<u8> = Rgba([255, 0, 255, 128]);
    const MARK: Rgba<u8> = Rgba([255, 255, 255, 255]);
    let (w, h) = frame_size;

    (0..count)
        .map(|_| {
            let mut frame = RgbaImage::from_pixel(w, h, TRANSPARENT);
            // Two pixel border inset by two, matching a stroked rectangle.
            for y in 0..h {
                for x in 0..w {
                    let in_outer = x >= 2 && y >= 2 && x + 2 < w && y + 2 < h;
                    let in_inner = x >= 4 && y >= 4 && x + 4 < w && y + 4 < h;
                    if in_outer && !in_inner {
                        frame.put_pixel(x, y, BORDER);
                    }
                }
            }
            // Diagonal cross marks the frame as a placeholder.
            let span = w.min(h);
            for i in 0..span {
                if i >= 10 && i + 10 < span {
                    frame.put_pixel(i, i, MARK);
                    frame.put_pixel(span - 1 - i, i, MARK);
                }
            }
            frame
        })
        .collect()
}
