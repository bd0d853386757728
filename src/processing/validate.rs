use super::{find_sidecar, png_files, stem, Validator};
use crate::atlas::{AtlasSidecar, AtlasValidator, AtlasView};
use crate::config::PipelineConfig;
use crate::pipeline::{StepError, StepOutput};

/// Runs [`AtlasValidator`] over every atlas in the atlas directory.
///
/// Atlases named after a configured unit are also checked against that
/// unit's frame layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtlasDirectoryValidator;

impl Validator for AtlasDirectoryValidator {
    fn validate(&self, config: &PipelineConfig) -> Result<StepOutput, StepError> {
        let validator = AtlasValidator::new(config.atlas_config());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut checked = 0usize;

        for path in png_files(&config.paths.atlases_dir, false)? {
            let name = stem(&path);
            let Some(sidecar_path) = find_sidecar(&path) else {
                warnings.push(format!("{}: no sidecar file, skipped", name));
                continue;
            };
            let image = image::open(&path)?.to_rgba8();
            let sidecar = AtlasSidecar::load(&sidecar_path)?;
            let spec = config.units.iter().find(|u| u.name == name);

            for issue in validator.validate(AtlasView::from_sidecar(&image, &sidecar), spec) {
                let line = format!("{}: {}", name, issue);
                if issue.is_error() {
                    errors.push(line);
                } else {
                    warnings.push(line);
                }
            }
            checked += 1;
        }

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "atlas validation failed");
            return Err(StepError::msg(format!(
                "{} validation error(s): {}",
                errors.len(),
                errors.join("; ")
            )));
        }

        Ok(StepOutput::new().with("atlases_validated", checked).with_warnings(warnings))
    }
}
