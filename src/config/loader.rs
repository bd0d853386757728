//! Configuration loading and discovery for `asset-pipeline.toml`
//!
//! Provides functions to find, load, and override configuration.

use super::schema::PipelineConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery.
pub const CONFIG_FILENAME: &str = "asset-pipeline.toml";

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "ASSET_PIPELINE_";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    /// JSON parsing error
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// Extension is neither `.toml` nor `.json`
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
    /// Environment variable holds a value of the wrong type
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Find the config file by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find the config file by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load, override and validate configuration.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, starts from the
/// defaults. `ASSET_PIPELINE_*` environment variables are applied last.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    let mut config = match config_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading configuration");
            load_config_file(&p)?
        }
        None => PipelineConfig::default(),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Parse a configuration file, choosing TOML or JSON by extension.
pub fn load_config_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let extension =
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).unwrap_or_default();

    match extension.as_str() {
        "toml" => Ok(toml::from_str(&contents)?),
        "json" => Ok(serde_json::from_str(&contents)?),
        other => Err(ConfigError::UnsupportedFormat(format!(".{}", other))),
    }
}

/// Apply `ASSET_PIPELINE_*` overrides read through `lookup`.
///
/// Unset or empty variables leave the config untouched.
pub fn apply_env_overrides<F>(config: &mut PipelineConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        let key = format!("{}{}", ENV_PREFIX, name);
        lookup(&key).filter(|v| !v.is_empty()).map(|v| (key, v))
    };

    if let Some((_, packs)) = var("KENNEY_PACKS") {
        config.sources.kenney_packs =
            packs.split(',').map(str::trim).filter(|p| !p.is_empty()).map(String::from).collect();
    }
    if let Some((_, provider)) = var("AI_PROVIDER") {
        config.sources.ai_provider = provider;
    }
    if let Some((key, padding)) = var("ATLAS_PADDING") {
        config.processing.atlas_padding = parse_env(&key, &padding)?;
    }
    if let (Some((kw, w)), Some((kh, h))) = (var("TILE_WIDTH"), var("TILE_HEIGHT")) {
        config.processing.tile_size = [parse_env(&kw, &w)?, parse_env(&kh, &h)?];
    }
    if let (Some((kw, w)), Some((kh, h))) = (var("UNIT_FRAME_WIDTH"), var("UNIT_FRAME_HEIGHT")) {
        config.processing.unit_frame_size = [parse_env(&kw, &w)?, parse_env(&kh, &h)?];
    }

    let dirs: [(&str, &mut PathBuf); 6] = [
        ("ASSETS_DIR", &mut config.paths.assets_dir),
        ("SPRITES_DIR", &mut config.paths.sprites_dir),
        ("ATLASES_DIR", &mut config.paths.atlases_dir),
        ("DATA_DIR", &mut config.paths.data_dir),
        ("PREVIEW_DIR", &mut config.paths.preview_dir),
        ("CACHE_DIR", &mut config.cache.dir),
    ];
    for (name, slot) in dirs {
        if let Some((_, dir)) = var(name) {
            *slot = PathBuf::from(dir);
        }
    }

    if let Some((_, flag)) = var("GENERATE_PREVIEWS") {
        config.preview.generate_previews = flag.eq_ignore_ascii_case("true");
    }
    if let Some((key, policy)) = var("CACHE_POLICY") {
        config.cache.policy =
            policy.parse().map_err(|_| ConfigError::InvalidEnv { var: key, value: policy })?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var: key.to_string(), value: value.to_string() })
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Make every configured directory absolute against `project_root`.
pub fn resolve_config_paths(config: &mut PipelineConfig, project_root: &Path) {
    let paths = &mut config.paths;
    for path in [
        &mut paths.assets_dir,
        &mut paths.sprites_dir,
        &mut paths.atlases_dir,
        &mut paths.data_dir,
        &mut paths.preview_dir,
        &mut paths.link_path,
        &mut config.sources.pack_dir,
        &mut config.cache.dir,
    ] {
        let resolved = resolve_path(project_root, path);
        *path = resolved;
    }
}
