use super::{png_files, stem, PreviewRenderer};
use crate::config::PipelineConfig;
use crate::pipeline::{StepError, StepOutput};
use image::imageops::{self, FilterType};
use std::fs;

/// Writes `<atlas>_preview.png` into the preview directory, scaled so the
/// longest edge fits `preview.max_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaledPreview;

/// Scale `(w, h)` down to fit `max` on the longest edge, keeping aspect ratio.
pub(crate) fn fit_within(w: u32, h: u32, max: u32) -> (u32, u32) {
    let longest = w.max(h);
    if longest <= max || longest == 0 {
        return (w, h);
    }
    let scale = |v: u32| ((u64::from(v) * u64::from(max)) / u64::from(longest)).max(1) as u32;
    (scale(w), scale(h))
}

impl PreviewRenderer for ScaledPreview {
    fn render(&self, config: &PipelineConfig) -> Result<StepOutput, StepError> {
        if !config.preview.generate_previews {
            tracing::debug!("preview generation disabled");
            return Ok(StepOutput::new().with("previews_created", 0).with("skipped", true));
        }

        let out_dir = &config.paths.preview_dir;
        fs::create_dir_all(out_dir)?;

        let mut created = 0usize;
        for path in png_files(&config.paths.atlases_dir, false)? {
            let atlas = image::open(&path)?.to_rgba8();
            let (w, h) = fit_within(atlas.width(), atlas.height(), config.preview.max_size);
            let preview = if (w, h) == atlas.dimensions() {
                atlas
            } else {
                imageops::resize(&atlas, w, h, FilterType::Nearest)
            };

            let target = out_dir.join(format!("{}_preview.png", stem(&path)));
            preview.save(&target)?;
            tracing::debug!(path = %target.display(), width = w, height = h, "wrote preview");
            created += 1;
        }

        Ok(StepOutput::new()
            .with("previews_created", created)
            .with("preview_dir", out_dir.display().to_string()))
    }
}
