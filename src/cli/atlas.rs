//! Atlas command implementations (worker, unit, sprites)

use std::path::Path;
use std::process::ExitCode;

use image::RgbaImage;

use super::{load_pipeline_config, AtlasAction, EXIT_ERROR, EXIT_SUCCESS};
use crate::atlas::{AtlasGenerator, AtlasResult, AtlasValidator, AtlasView, SpriteInput, UnitSpec};
use crate::config::PipelineConfig;
use crate::processing::png_files;

/// Run the atlas command
pub fn run_atlas(config_path: Option<&Path>, action: AtlasAction) -> ExitCode {
    let config = match load_pipeline_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let generator = AtlasGenerator::new(config.atlas_config());

    let (built, output, name, spec) = match action {
        AtlasAction::Worker { input, output, name } => {
            let built = load_images(&input).and_then(|frames| {
                generator.create_worker_atlas(&frames, &name).map_err(|e| e.to_string())
            });
            (built, output, name, None)
        }
        AtlasAction::Unit { input, output, name, directions, frames, frame_size } => {
            let spec = UnitSpec::new(&name, directions, frames, frame_size);
            let built = load_images(&input).and_then(|images| {
                generator.create_unit_atlas(&images, &spec).map_err(|e| e.to_string())
            });
            (built, output, name, Some(spec))
        }
        AtlasAction::Sprites { input, output, name } => {
            let built = load_sprites(&input).and_then(|sprites| {
                generator.create_sprite_atlas(&sprites).map_err(|e| e.to_string())
            });
            (built, output, name, None)
        }
    };

    let atlas = match built {
        Ok(atlas) => atlas,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    save_and_report(&config, &atlas, &output, &name, spec.as_ref())
}

fn save_and_report(
    config: &PipelineConfig,
    atlas: &AtlasResult,
    output: &Path,
    name: &str,
    spec: Option<&UnitSpec>,
) -> ExitCode {
    let saved = match atlas.save(
        output,
        name,
        &config.atlas_config().format,
        config.processing.sidecar_format,
    ) {
        Ok(saved) => saved,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!(
        "Created {}x{} atlas with {} frames",
        atlas.width(),
        atlas.height(),
        atlas.frame_map.len()
    );
    for path in saved.paths() {
        println!("  {}", path.display());
    }

    let issues = AtlasValidator::new(config.atlas_config()).validate(AtlasView::from(atlas), spec);
    for issue in &issues {
        println!("  {}", issue);
    }
    if issues.iter().any(|i| i.is_error()) {
        return ExitCode::from(EXIT_ERROR);
    }
    ExitCode::from(EXIT_SUCCESS)
}

fn load_images(dir: &Path) -> Result<Vec<RgbaImage>, String> {
    let files = png_files(dir, false).map_err(|e| e.to_string())?;
    files
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgba8())
                .map_err(|e| format!("{}: {}", path.display(), e))
        })
        .collect()
}

fn load_sprites(dir: &Path) -> Result<Vec<SpriteInput>, String> {
    let files = png_files(dir, false).map_err(|e| e.to_string())?;
    files
        .iter()
        .map(|path| {
            let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            image::open(path)
                .map(|img| SpriteInput::new(name, img.to_rgba8()))
                .map_err(|e| format!("{}: {}", path.display(), e))
        })
        .collect()
}
