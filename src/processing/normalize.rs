use super::{png_files, Normalizer};
use crate::config::PipelineConfig;
use crate::pipeline::{StepError, StepOutput};

/// Decodes every sprite to confirm it is a readable image.
///
/// Pixels are left untouched. Undecodable files become warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeNormalizer;

impl Normalizer for DecodeNormalizer {
    fn normalize(&self, config: &PipelineConfig) -> Result<StepOutput, StepError> {
        let dir = &config.paths.sprites_dir;
        let mut decoded = 0usize;
        let mut warnings = Vec::new();

        for path in png_files(dir, true)? {
            match image::open(&path) {
                Ok(img) => {
                    tracing::debug!(path = %path.display(), width = img.width(), height = img.height(), "decoded sprite");
                    decoded += 1;
                }
                Err(e) => warnings.push(format!("Could not decode {}: {}", path.display(), e)),
            }
        }

        tracing::info!(decoded, skipped = warnings.len(), "normalized sprites");
        Ok(StepOutput::new()
            .with("normalized_assets", decoded)
            .with("sprites_dir", dir.display().to_string())
            .with_warnings(warnings)
            .with_assets_processed(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_counts_decodable_sprites() {
        let temp = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.paths.sprites_dir = temp.path().to_path_buf();

        RgbaImage::new(4, 4).save(temp.path().join("ok.png")).unwrap();
        fs::write(temp.path().join("broken.png"), b"not a png").unwrap();

        let output = DecodeNormalizer.normalize(&config).unwrap();
        assert_eq!(output.assets_processed, 1);
        assert_eq!(output.data["normalized_assets"], serde_json::json!(1));
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("broken.png"));
    }
}
