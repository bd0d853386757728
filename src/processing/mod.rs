//! Processing collaborators invoked by the default step bodies
//!
//! Each collaborator exposes one coarse entry point that reads the pipeline
//! configuration and returns a [`StepOutput`] or fails. The defaults here
//! are deliberately small; richer implementations plug in through the traits.

mod metadata;
mod normalize;
mod preview;
mod validate;

pub use metadata::{AtlasIndexEntry, SidecarMetadata, SpriteIndex, SPRITE_INDEX_FILENAME};
pub use normalize::DecodeNormalizer;
pub use preview::ScaledPreview;
pub use validate::AtlasDirectoryValidator;

use crate::config::PipelineConfig;
use crate::pipeline::{StepError, StepOutput};
use std::path::{Path, PathBuf};

/// Prepares raw sprites for packing.
pub trait Normalizer {
    fn normalize(&self, config: &PipelineConfig) -> Result<StepOutput, StepError>;
}

/// Writes data files describing the generated atlases.
pub trait MetadataGenerator {
    fn generate(&self, config: &PipelineConfig) -> Result<StepOutput, StepError>;
}

/// Renders preview images of the generated atlases.
pub trait PreviewRenderer {
    fn render(&self, config: &PipelineConfig) -> Result<StepOutput, StepError>;
}

/// Checks generated assets; errors fail the step.
pub trait Validator {
    fn validate(&self, config: &PipelineConfig) -> Result<StepOutput, StepError>;
}

/// PNG files in `dir`, sorted by path.
///
/// A missing directory yields no files.
pub fn png_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, StepError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = if recursive {
        format!("{}/**/*.png", base)
    } else {
        format!("{}/*.png", base)
    };

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
    files.sort();
    Ok(files)
}

/// Sidecar next to an atlas image, preferring JSON over TOML.
pub fn find_sidecar(image: &Path) -> Option<PathBuf> {
    ["json", "toml"].iter().map(|ext| image.with_extension(ext)).find(|p| p.is_file())
}

/// File stem as an owned string.
pub(crate) fn stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_png_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("units/worker")).unwrap();
        fs::write(temp.path().join("b.png"), b"").unwrap();
        fs::write(temp.path().join("a.png"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();
        fs::write(temp.path().join("units/worker/0.png"), b"").unwrap();

        let flat = png_files(temp.path(), false).unwrap();
        assert_eq!(flat.iter().map(|p| stem(p)).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(png_files(temp.path(), true).unwrap().len(), 3);
        assert!(png_files(&temp.path().join("missing"), true).unwrap().is_empty());
    }

    #[test]
    fn test_find_sidecar_prefers_json() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("tiles.png");
        assert_eq!(find_sidecar(&image), None);

        fs::write(temp.path().join("tiles.toml"), b"").unwrap();
        assert_eq!(find_sidecar(&image), Some(temp.path().join("tiles.toml")));

        fs::write(temp.path().join("tiles.json"), b"").unwrap();
        assert_eq!(find_sidecar(&image), Some(temp.path().join("tiles.json")));
    }
}
