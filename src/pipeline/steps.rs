//! Default step bodies for the asset build.

use super::error::StepError;
use super::result::PipelineState;
use super::runner::{StepOutput, StepRunner};
use super::step::StepId;
use crate::atlas::{AtlasGenerator, SpriteInput};
use crate::config::PipelineConfig;
use crate::processing::{
    png_files, AtlasDirectoryValidator, DecodeNormalizer, MetadataGenerator, Normalizer,
    PreviewRenderer, ScaledPreview, SidecarMetadata, Validator,
};
use crate::providers::{create_provider, AssetProvider, DirectoryProvider, ProviderError};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the atlas built from loose sprites.
pub const SPRITE_ATLAS_NAME: &str = "sprites";

/// Step bodies driven by a [`PipelineConfig`].
///
/// Files written by the source and atlas steps are remembered so their
/// rollback hooks can delete them.
pub struct AssetSteps {
    config: PipelineConfig,
    normalizer: Box<dyn Normalizer>,
    metadata: Box<dyn MetadataGenerator>,
    preview: Box<dyn PreviewRenderer>,
    validator: Box<dyn Validator>,
    written: BTreeMap<StepId, Vec<PathBuf>>,
}

impl AssetSteps {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            normalizer: Box::new(DecodeNormalizer),
            metadata: Box::new(SidecarMetadata),
            preview: Box::new(ScaledPreview),
            validator: Box::new(AtlasDirectoryValidator),
            written: BTreeMap::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_metadata(mut self, metadata: Box<dyn MetadataGenerator>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewRenderer>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Files written by the last execution of `step`.
    pub fn written(&self, step: StepId) -> &[PathBuf] {
        self.written.get(&step).map(Vec::as_slice).unwrap_or_default()
    }

    fn symlink(&mut self) -> Result<StepOutput, StepError> {
        let paths = &self.config.paths;
        fs::create_dir_all(&paths.assets_dir)?;
        let target = fs::canonicalize(&paths.assets_dir)?;
        let link = &paths.link_path;

        match fs::symlink_metadata(link) {
            Ok(meta) if meta.file_type().is_symlink() => {
                tracing::debug!(link = %link.display(), "replacing existing symlink");
                remove_link(link)?;
            }
            Ok(_) => {
                return Err(StepError::msg(format!(
                    "{} exists and is not a symlink",
                    link.display()
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        symlink_dir(&target, link)?;

        if fs::read_link(link)? != target {
            return Err(StepError::msg(format!(
                "Symlink validation failed: {} does not point at {}",
                link.display(),
                target.display()
            )));
        }

        tracing::info!(link = %link.display(), target = %target.display(), "created asset symlink");
        Ok(StepOutput::new().with("symlink_target", target.display().to_string()))
    }

    fn kenney_sources(&mut self) -> Result<StepOutput, StepError> {
        let packs = self.config.sources.kenney_packs.clone();
        if packs.is_empty() {
            return Ok(StepOutput::new()
                .with("assets_fetched", 0)
                .with("message", "No Kenney packs configured"));
        }

        let provider = DirectoryProvider::new(self.config.sources.pack_dir.clone(), packs.clone());
        let output = self.import_assets(StepId::KenneySources, &provider)?;
        Ok(output.with("packs", packs))
    }

    fn ai_sources(&mut self) -> Result<StepOutput, StepError> {
        let sources = &self.config.sources;
        let provider = match sources.ai_provider.as_str() {
            "none" => {
                return Ok(StepOutput::new()
                    .with("assets_fetched", 0)
                    .with("message", "AI generation disabled"));
            }
            "stub" => create_provider("stub", &sources.ai_config)?,
            other => return Err(ProviderError::Unknown(other.to_string()).into()),
        };

        let output = self.import_assets(StepId::AiSources, provider.as_ref())?;
        Ok(output.with("provider", provider.name()))
    }

    /// Copy every asset `provider` lists into the sprites directory.
    fn import_assets(
        &mut self,
        step: StepId,
        provider: &dyn AssetProvider,
    ) -> Result<StepOutput, StepError> {
        let sprites_dir = self.config.paths.sprites_dir.clone();
        fs::create_dir_all(&sprites_dir)?;

        let mut written = Vec::new();
        let mut warnings = Vec::new();
        for spec in provider.list_available()? {
            let target = sprites_dir.join(format!("{}.png", spec.name));
            if written.contains(&target) {
                tracing::warn!(asset = %spec.name, "duplicate asset name, keeping the first");
                warnings.push(format!(
                    "Skipped {}: name collides with an asset already imported by {}",
                    spec.name, step
                ));
                continue;
            }
            match provider.fetch(&spec).map_err(StepError::from).and_then(|bytes| {
                fs::write(&target, bytes)?;
                Ok(())
            }) {
                Ok(()) => {
                    tracing::debug!(asset = %spec.name, kind = %spec.kind, "fetched asset");
                    written.push(target);
                }
                Err(e) => warnings.push(format!("Failed to fetch {}: {}", spec.name, e)),
            }
        }

        tracing::info!(provider = provider.name(), fetched = written.len(), "imported assets");
        let output = StepOutput::new()
            .with("assets_fetched", written.len())
            .with_warnings(warnings);
        self.written.insert(step, written);
        Ok(output)
    }

    /// Build every atlas. Files saved before a failure are deleted again.
    fn atlas(&mut self) -> Result<StepOutput, StepError> {
        let mut written = Vec::new();
        match self.build_atlases(&mut written) {
            Ok(output) => {
                self.written.insert(StepId::Atlas, written);
                Ok(output)
            }
            Err(e) => {
                if let Err(cleanup) = remove_files(&written) {
                    tracing::warn!(error = %cleanup, "failed to remove partial atlas output");
                }
                Err(e)
            }
        }
    }

    fn build_atlases(&self, written: &mut Vec<PathBuf>) -> Result<StepOutput, StepError> {
        let atlas_config = self.config.atlas_config();
        let generator = AtlasGenerator::new(atlas_config.clone());
        let paths = &self.config.paths;
        let sidecar_format = self.config.processing.sidecar_format;

        let mut created = Vec::new();

        let sprites = png_files(&paths.sprites_dir, false)?
            .into_iter()
            .map(|path| -> Result<SpriteInput, StepError> {
                let name = crate::processing::stem(&path);
                Ok(SpriteInput::new(name, image::open(&path)?.to_rgba8()))
            })
            .collect::<Result<Vec<_>, StepError>>()?;
        if !sprites.is_empty() {
            let result = generator.create_sprite_atlas(&sprites)?;
            let saved = result.save(&paths.atlases_dir, SPRITE_ATLAS_NAME, &atlas_config.format, sidecar_format)?;
            written.extend(saved.paths().map(Path::to_path_buf));
            created.push(SPRITE_ATLAS_NAME.to_string());
        }

        for spec in &self.config.units {
            let frames = load_frames(&paths.sprites_dir.join("units").join(&spec.name))?;
            let result = if spec.name == "worker" {
                generator.create_worker_atlas(&frames, &spec.name)?
            } else {
                generator.create_unit_atlas(&frames, spec)?
            };
            let saved = result.save(&paths.atlases_dir, &spec.name, &atlas_config.format, sidecar_format)?;
            written.extend(saved.paths().map(Path::to_path_buf));
            created.push(spec.name.clone());
        }

        tracing::info!(atlases = created.len(), "generated atlases");
        let output = StepOutput::new()
            .with("atlases_created", created.len())
            .with("atlases", created)
            .with_assets_processed(sprites.len());
        Ok(output)
    }

    fn remove_written(&mut self, step: StepId) -> Result<(), StepError> {
        let paths = self.written.remove(&step).unwrap_or_default();
        Ok(remove_files(&paths)?)
    }
}

impl StepRunner for AssetSteps {
    fn run(&mut self, step: StepId, _state: &PipelineState) -> Result<StepOutput, StepError> {
        match step {
            StepId::Symlink => self.symlink(),
            StepId::KenneySources => self.kenney_sources(),
            StepId::AiSources => self.ai_sources(),
            StepId::Normalize => self.normalizer.normalize(&self.config),
            StepId::Atlas => self.atlas(),
            StepId::Metadata => self.metadata.generate(&self.config),
            StepId::Preview => self.preview.render(&self.config),
            StepId::Validate => self.validator.validate(&self.config),
        }
    }

    fn rollback(&mut self, step: StepId) -> Result<(), StepError> {
        match step {
            StepId::Symlink => {
                let link = &self.config.paths.link_path;
                match fs::symlink_metadata(link) {
                    Ok(meta) if meta.file_type().is_symlink() => Ok(remove_link(link)?),
                    _ => Ok(()),
                }
            }
            StepId::KenneySources | StepId::AiSources | StepId::Atlas => self.remove_written(step),
            StepId::Normalize | StepId::Metadata | StepId::Preview | StepId::Validate => Ok(()),
        }
    }
}

/// Delete `paths`, treating already missing files as removed.
fn remove_files(paths: &[PathBuf]) -> io::Result<()> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Unit animation frames in `dir`, ordered by file name.
fn load_frames(dir: &Path) -> Result<Vec<RgbaImage>, StepError> {
    png_files(dir, false)?
        .iter()
        .map(|path| -> Result<RgbaImage, StepError> { Ok(image::open(path)?.to_rgba8()) })
        .collect()
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_dir(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported on this platform"))
}

fn remove_link(link: &Path) -> io::Result<()> {
    fs::remove_file(link).or_else(|_| fs::remove_dir(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasSidecar, UnitSpec};
    use image::Rgba;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> PipelineConfig {
        let root = temp.path();
        let mut config = PipelineConfig::default();
        config.paths.assets_dir = root.join("assets");
        config.paths.sprites_dir = root.join("assets/sprites");
        config.paths.atlases_dir = root.join("assets/atlases");
        config.paths.data_dir = root.join("assets/data");
        config.paths.preview_dir = root.join("assets/preview");
        config.paths.link_path = root.join("client/assets");
        config.sources.pack_dir = root.join("packs");
        config
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(w, h, Rgba([10, 120, 30, 255])).save(path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_created_and_rolled_back() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let link = config.paths.link_path.clone();
        let mut steps = AssetSteps::new(config);
        let state = PipelineState::new();

        steps.run(StepId::Symlink, &state).unwrap();
        // second run replaces the link
        let output = steps.run(StepId::Symlink, &state).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(output.data["symlink_target"].as_str().unwrap().ends_with("assets"));

        steps.rollback(StepId::Symlink).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
    }

    #[test]
    fn test_symlink_refuses_real_directory() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        fs::create_dir_all(&config.paths.link_path).unwrap();

        let mut steps = AssetSteps::new(config);
        let err = steps.run(StepId::Symlink, &PipelineState::new()).unwrap_err();
        assert!(err.to_string().contains("not a symlink"));
    }

    #[test]
    fn test_kenney_sources_imports_and_rolls_back() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.sources.kenney_packs = vec!["isometric-tiles".to_string()];
        write_png(&config.sources.pack_dir.join("isometric-tiles/grass.png"), 8, 4);
        let sprite = config.paths.sprites_dir.join("grass.png");

        let mut steps = AssetSteps::new(config);
        let output = steps.run(StepId::KenneySources, &PipelineState::new()).unwrap();
        assert_eq!(output.data["assets_fetched"], serde_json::json!(1));
        assert!(sprite.exists());
        assert_eq!(steps.written(StepId::KenneySources), &[sprite.clone()]);

        steps.rollback(StepId::KenneySources).unwrap();
        assert!(!sprite.exists());
        assert!(steps.written(StepId::KenneySources).is_empty());
    }

    #[test]
    fn test_ai_sources_providers() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        let state = PipelineState::new();

        let output = AssetSteps::new(config.clone()).run(StepId::AiSources, &state).unwrap();
        assert_eq!(output.data["assets_fetched"], serde_json::json!(0));

        config.sources.ai_provider = "stub".to_string();
        config.sources.ai_config = toml::from_str("assets = [\"farm\"]").unwrap();
        let mut steps = AssetSteps::new(config.clone());
        steps.run(StepId::AiSources, &state).unwrap();
        let farm = image::open(config.paths.sprites_dir.join("farm.png")).unwrap();
        assert_eq!((farm.width(), farm.height()), (64, 96));

        config.sources.ai_provider = "dalle".to_string();
        let err = AssetSteps::new(config).run(StepId::AiSources, &state).unwrap_err();
        assert!(matches!(err, StepError::Provider(ProviderError::Unknown(_))));
    }

    #[test]
    fn test_atlas_step_builds_sprite_and_unit_atlases() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.units.push(UnitSpec::new("knight", 2, 2, (16, 16)));
        write_png(&config.paths.sprites_dir.join("grass.png"), 32, 16);
        write_png(&config.paths.sprites_dir.join("road.png"), 32, 16);
        for i in 0..4 {
            write_png(&config.paths.sprites_dir.join(format!("units/knight/{}.png", i)), 16, 16);
        }
        let atlases_dir = config.paths.atlases_dir.clone();

        let mut steps = AssetSteps::new(config);
        let output = steps.run(StepId::Atlas, &PipelineState::new()).unwrap();
        assert_eq!(output.data["atlases_created"], serde_json::json!(2));

        let sprites = AtlasSidecar::load(&atlases_dir.join("sprites.json")).unwrap();
        assert_eq!(sprites.frames.len(), 2);
        let knight = AtlasSidecar::load(&atlases_dir.join("knight.json")).unwrap();
        assert!(knight.frames.contains_key("walk_NE_1"));
        assert_eq!(steps.written(StepId::Atlas).len(), 4);

        steps.rollback(StepId::Atlas).unwrap();
        assert!(!atlases_dir.join("knight.png").exists());
        assert!(!atlases_dir.join("sprites.json").exists());
    }

    #[test]
    fn test_unit_with_missing_frames_fails() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.units.push(UnitSpec::new("archer", 8, 8, (64, 64)));

        let mut steps = AssetSteps::new(config);
        let err = steps.run(StepId::Atlas, &PipelineState::new()).unwrap_err();
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn test_failed_unit_atlas_removes_saved_sprite_atlas() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.units.push(UnitSpec::new("knight", 2, 2, (16, 16)));
        write_png(&config.paths.sprites_dir.join("grass.png"), 32, 16);
        let atlases_dir = config.paths.atlases_dir.clone();

        let mut steps = AssetSteps::new(config);
        assert!(steps.run(StepId::Atlas, &PipelineState::new()).is_err());

        assert!(!atlases_dir.join("sprites.png").exists());
        assert!(!atlases_dir.join("sprites.json").exists());
        assert!(steps.written(StepId::Atlas).is_empty());
    }

    #[test]
    fn test_colliding_pack_assets_keep_first_and_warn() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.sources.kenney_packs = vec!["buildings".to_string(), "tiles".to_string()];
        write_png(&config.sources.pack_dir.join("buildings/stone.png"), 8, 8);
        write_png(&config.sources.pack_dir.join("tiles/stone.png"), 4, 2);
        let sprite = config.paths.sprites_dir.join("stone.png");

        let mut steps = AssetSteps::new(config);
        let output = steps.run(StepId::KenneySources, &PipelineState::new()).unwrap();

        assert_eq!(output.data["assets_fetched"], serde_json::json!(1));
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("stone"));
        let kept = image::open(&sprite).unwrap();
        assert_eq!((kept.width(), kept.height()), (8, 8));
    }
}
