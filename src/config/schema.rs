//! Configuration schema for `asset-pipeline.toml`
//!
//! Every field has a serde default, so an empty file yields a usable config.
//!
//! ```toml
//! [sources]
//! kenney_packs = ["isometric-buildings"]
//! pack_dir = "vendor/kenney"
//! ai_provider = "stub"
//!
//! [processing]
//! atlas_padding = 2
//! max_atlas_size = [1024, 1024]
//!
//! [errors]
//! ignore_categories = ["validate"]
//!
//! [cache]
//! policy = "fingerprint_match"
//!
//! [[units]]
//! name = "worker"
//! ```

use crate::atlas::{AtlasConfig, OverflowPolicy, SidecarFormat, UnitSpec};
use crate::pipeline::{CachePolicy, StepId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Number of hex characters kept from the configuration digest.
const FINGERPRINT_LEN: usize = 16;

/// Asset source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Kenney pack names, each a directory under `pack_dir`
    #[serde(default)]
    pub kenney_packs: Vec<String>,
    #[serde(default = "default_pack_dir")]
    pub pack_dir: PathBuf,
    /// `none`, `stub`, or the name of an external provider
    #[serde(default = "default_ai_provider")]
    pub ai_provider: String,
    #[serde(default)]
    pub ai_config: toml::Table,
}

fn default_pack_dir() -> PathBuf {
    PathBuf::from("cache/kenney")
}

fn default_ai_provider() -> String {
    "none".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            kenney_packs: Vec::new(),
            pack_dir: default_pack_dir(),
            ai_provider: default_ai_provider(),
            ai_config: toml::Table::new(),
        }
    }
}

/// Image processing and atlas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: [u32; 2],
    #[serde(default = "default_unit_frame_size")]
    pub unit_frame_size: [u32; 2],
    #[serde(default)]
    pub atlas_padding: u32,
    #[serde(default = "default_true")]
    pub power_of_two: bool,
    #[serde(default = "default_max_atlas_size")]
    pub max_atlas_size: [u32; 2],
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default)]
    pub sidecar_format: SidecarFormat,
}

fn default_tile_size() -> [u32; 2] {
    [64, 32]
}

fn default_unit_frame_size() -> [u32; 2] {
    [64, 64]
}

fn default_max_atlas_size() -> [u32; 2] {
    [2048, 2048]
}

fn default_true() -> bool {
    true
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            unit_frame_size: default_unit_frame_size(),
            atlas_padding: 0,
            power_of_two: true,
            max_atlas_size: default_max_atlas_size(),
            overflow: OverflowPolicy::default(),
            sidecar_format: SidecarFormat::default(),
        }
    }
}

/// Input and output directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_sprites_dir")]
    pub sprites_dir: PathBuf,
    #[serde(default = "default_atlases_dir")]
    pub atlases_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,
    /// Symlink created by the `symlink` step, pointing at `assets_dir`
    #[serde(default = "default_link_path")]
    pub link_path: PathBuf,
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_sprites_dir() -> PathBuf {
    PathBuf::from("assets/sprites")
}

fn default_atlases_dir() -> PathBuf {
    PathBuf::from("assets/atlases")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("assets/data")
}

fn default_preview_dir() -> PathBuf {
    PathBuf::from("assets/preview")
}

fn default_link_path() -> PathBuf {
    PathBuf::from("crates/oldtimes-client/assets")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            sprites_dir: default_sprites_dir(),
            atlases_dir: default_atlases_dir(),
            data_dir: default_data_dir(),
            preview_dir: default_preview_dir(),
            link_path: default_link_path(),
        }
    }
}

/// Preview rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_true")]
    pub generate_previews: bool,
    /// Longest edge of a preview image in pixels
    #[serde(default = "default_preview_size")]
    pub max_size: u32,
}

fn default_preview_size() -> u32 {
    256
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { generate_previews: true, max_size: default_preview_size() }
    }
}

/// Failure policy settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorsConfig {
    /// Step names whose failures never abort a run
    #[serde(default)]
    pub ignore_categories: Vec<String>,
}

/// Step cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub policy: CachePolicy,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/pipeline")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { dir: default_cache_dir(), policy: CachePolicy::default() }
    }
}

/// A problem found while validating configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub errors: ErrorsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Unit animation atlases built by the `atlas` step
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        let positive = [
            ("processing.tile_size", self.processing.tile_size),
            ("processing.unit_frame_size", self.processing.unit_frame_size),
            ("processing.max_atlas_size", self.processing.max_atlas_size),
        ];
        for (field, [w, h]) in positive {
            if w == 0 || h == 0 {
                push(field, "dimensions must be positive");
            }
        }

        if self.preview.max_size == 0 {
            push("preview.max_size", "must be a positive integer");
        }

        for name in &self.errors.ignore_categories {
            if name.parse::<StepId>().is_err() {
                push("errors.ignore_categories", &format!("unknown step '{}'", name));
            }
        }

        for (i, unit) in self.units.iter().enumerate() {
            let field = format!("units[{}]", i);
            if unit.name.is_empty() {
                push(&field, "name must be a non-empty string");
            }
            if unit.directions == 0 || unit.frames_per_direction == 0 {
                push(&field, "directions and frames_per_direction must be positive");
            }
            if unit.frame_size.0 == 0 || unit.frame_size.1 == 0 {
                push(&field, "frame_size dimensions must be positive");
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Atlas settings derived from the processing section.
    pub fn atlas_config(&self) -> AtlasConfig {
        AtlasConfig {
            padding: self.processing.atlas_padding,
            power_of_two: self.processing.power_of_two,
            max_size: (self.processing.max_atlas_size[0], self.processing.max_atlas_size[1]),
            overflow: self.processing.overflow,
            ..AtlasConfig::default()
        }
    }

    /// Stable content hash of the build inputs.
    ///
    /// SHA-256 over the JSON serialization of every section except `cache`,
    /// truncated to 16 hex characters. Struct fields serialize in declaration
    /// order and maps are ordered, so the value is identical across processes.
    pub fn fingerprint(&self) -> String {
        let view = FingerprintView {
            sources: &self.sources,
            processing: &self.processing,
            paths: &self.paths,
            preview: &self.preview,
            errors: &self.errors,
            units: &self.units,
        };
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut hex = hex::encode(digest);
        hex.truncate(FINGERPRINT_LEN);
        hex
    }
}

/// Sections of [`PipelineConfig`] that affect what a build produces.
#[derive(Serialize)]
struct FingerprintView<'a> {
    sources: &'a SourcesConfig,
    processing: &'a ProcessingConfig,
    paths: &'a PathsConfig,
    preview: &'a PreviewConfig,
    errors: &'a ErrorsConfig,
    units: &'a [UnitSpec],
}
