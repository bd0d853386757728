//! Asset source providers
//!
//! A provider lists the assets it can supply and fetches their encoded bytes.
//! The pipeline treats providers as opaque: it only relies on the
//! [`AssetProvider`] contract.

mod directory;
mod stub;

pub use directory::DirectoryProvider;
pub use stub::StubProvider;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Error raised by an asset provider
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Requested asset does not exist
    #[error("Asset '{asset}' not found in {provider}")]
    NotFound { asset: String, provider: String },
    /// No provider is registered under this name
    #[error("Unknown asset provider '{0}'")]
    Unknown(String),
    /// Provider configuration is invalid
    #[error("Invalid configuration for {provider}: {message}")]
    Configuration { provider: String, message: String },
    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Image encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Broad category of a game asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Tile,
    Building,
    Unit,
}

impl AssetKind {
    /// Guess the kind and nominal size of an asset from its name.
    pub fn classify(name: &str) -> (AssetKind, (u32, u32)) {
        const BUILDINGS: [&str; 9] =
            ["lumberjack", "mill", "bakery", "sawmill", "quarry", "farm", "house", "tower", "castle"];
        const UNITS: [&str; 7] = ["worker", "unit", "character", "person", "soldier", "mage", "archer"];

        let lower = name.to_ascii_lowercase();
        if BUILDINGS.iter().any(|k| lower.contains(k)) {
            (AssetKind::Building, (64, 96))
        } else if UNITS.iter().any(|k| lower.contains(k)) {
            (AssetKind::Unit, (64, 64))
        } else {
            (AssetKind::Tile, (64, 32))
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Tile => write!(f, "tile"),
            AssetKind::Building => write!(f, "building"),
            AssetKind::Unit => write!(f, "unit"),
        }
    }
}

/// Description of an asset a provider can supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub name: String,
    pub kind: AssetKind,
    pub size: (u32, u32),
    pub source_path: Option<PathBuf>,
    pub metadata: BTreeMap<String, String>,
}

impl AssetSpec {
    /// Spec whose kind and size are inferred from the name.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let (kind, size) = AssetKind::classify(&name);
        Self { name, kind, size, source_path: None, metadata: BTreeMap::new() }
    }

    pub fn with_source(mut self, path: PathBuf) -> Self {
        self.source_path = Some(path);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A source of raw assets.
pub trait AssetProvider {
    fn name(&self) -> &str;

    /// Apply provider-specific settings.
    fn configure(&mut self, config: &toml::Table) -> Result<(), ProviderError>;

    fn list_available(&self) -> Result<Vec<AssetSpec>, ProviderError>;

    /// Encoded bytes (PNG) of one asset.
    fn fetch(&self, spec: &AssetSpec) -> Result<Vec<u8>, ProviderError>;
}

/// Create and configure a provider by name.
pub fn create_provider(
    name: &str,
    config: &toml::Table,
) -> Result<Box<dyn AssetProvider>, ProviderError> {
    let mut provider: Box<dyn AssetProvider> = match name {
        "stub" => Box::new(StubProvider::new()),
        "directory" => Box::new(DirectoryProvider::new(PathBuf::from("."), Vec::new())),
        other => return Err(ProviderError::Unknown(other.to_string())),
    };
    provider.configure(config)?;
    Ok(provider)
}

/// Read an optional list of strings from a config table.
pub(crate) fn string_list(
    provider: &str,
    config: &toml::Table,
    key: &str,
) -> Result<Option<Vec<String>>, ProviderError> {
    let Some(value) = config.get(key) else {
        return Ok(None);
    };
    let invalid = || ProviderError::Configuration {
        provider: provider.to_string(),
        message: format!("'{}' must be an array of strings", key),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(String::from).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(AssetKind::classify("Sawmill_Large"), (AssetKind::Building, (64, 96)));
        assert_eq!(AssetKind::classify("worker_walk"), (AssetKind::Unit, (64, 64)));
        assert_eq!(AssetKind::classify("grass_01"), (AssetKind::Tile, (64, 32)));
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider("dalle", &toml::Table::new()).err().unwrap();
        assert!(matches!(err, ProviderError::Unknown(name) if name == "dalle"));
    }

    #[test]
    fn test_string_list() {
        let config: toml::Table = toml::from_str("assets = [\"a\", \"b\"]\nbad = [1]").unwrap();
        assert_eq!(
            string_list("stub", &config, "assets").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(string_list("stub", &config, "missing").unwrap(), None);
        assert!(matches!(
            string_list("stub", &config, "bad"),
            Err(ProviderError::Configuration { .. })
        ));
    }
}
