//! `sprites.toml` index of generated atlases.

use super::{find_sidecar, png_files, stem, MetadataGenerator};
use crate::atlas::AtlasSidecar;
use crate::config::PipelineConfig;
use crate::pipeline::{StepError, StepOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

pub const SPRITE_INDEX_FILENAME: &str = "sprites.toml";

/// One atlas listed in `sprites.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasIndexEntry {
    pub image: String,
    pub sidecar: String,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<String>,
}

/// Contents of `sprites.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteIndex {
    #[serde(default)]
    pub atlases: BTreeMap<String, AtlasIndexEntry>,
}

/// Indexes every atlas sidecar found in the atlas directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarMetadata;

impl MetadataGenerator for SidecarMetadata {
    fn generate(&self, config: &PipelineConfig) -> Result<StepOutput, StepError> {
        let mut index = SpriteIndex::default();
        let mut warnings = Vec::new();

        for image in png_files(&config.paths.atlases_dir, false)? {
            let name = stem(&image);
            let Some(sidecar_path) = find_sidecar(&image) else {
                warnings.push(format!("Atlas {} has no sidecar file", name));
                continue;
            };
            let sidecar = match AtlasSidecar::load(&sidecar_path) {
                Ok(sidecar) => sidecar,
                Err(e) => {
                    warnings.push(format!("Could not read sidecar for {}: {}", name, e));
                    continue;
                }
            };

            let file_name = |p: &std::path::Path| {
                p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
            };
            index.atlases.insert(
                name,
                AtlasIndexEntry {
                    image: file_name(&image),
                    sidecar: file_name(&sidecar_path),
                    width: sidecar.meta.size.w,
                    height: sidecar.meta.size.h,
                    frames: sidecar.frames.keys().cloned().collect(),
                },
            );
        }

        fs::create_dir_all(&config.paths.data_dir)?;
        let output = config.paths.data_dir.join(SPRITE_INDEX_FILENAME);
        fs::write(&output, toml::to_string_pretty(&index)?)?;
        tracing::info!(atlases = index.atlases.len(), path = %output.display(), "wrote sprite index");

        Ok(StepOutput::new()
            .with("atlases_indexed", index.atlases.len())
            .with("output", output.display().to_string())
            .with_warnings(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasGenerator, SidecarFormat, SpriteInput};
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_indexes_saved_atlases() {
        let temp = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.paths.atlases_dir = temp.path().join("atlases");
        config.paths.data_dir = temp.path().join("data");

        let sprites = vec![
            SpriteInput::new("grass", RgbaImage::from_pixel(16, 8, Rgba([0, 255, 0, 255]))),
            SpriteInput::new("road", RgbaImage::from_pixel(16, 8, Rgba([90, 90, 90, 255]))),
        ];
        let atlas = AtlasGenerator::default().create_sprite_atlas(&sprites).unwrap();
        atlas.save(&config.paths.atlases_dir, "tiles", "RGBA", SidecarFormat::Toml).unwrap();
        RgbaImage::new(2, 2).save(config.paths.atlases_dir.join("orphan.png")).unwrap();

        let output = SidecarMetadata.generate(&config).unwrap();
        assert_eq!(output.data["atlases_indexed"], serde_json::json!(1));
        assert_eq!(output.warnings.len(), 1);

        let written = fs::read_to_string(config.paths.data_dir.join(SPRITE_INDEX_FILENAME)).unwrap();
        let index: SpriteIndex = toml::from_str(&written).unwrap();
        let tiles = &index.atlases["tiles"];
        assert_eq!(tiles.sidecar, "tiles.toml");
        assert_eq!(tiles.frames, vec!["grass".to_string(), "road".to_string()]);
        assert_eq!((tiles.width, tiles.height), (atlas.width(), atlas.height()));
    }
}
