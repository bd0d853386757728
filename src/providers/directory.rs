//! Provider backed by extracted asset packs on disk.

use super::{string_list, AssetProvider, AssetSpec, ProviderError};
use std::fs;
use std::path::{Path, PathBuf};

const PROVIDER_NAME: &str = "directory";

/// Serves every PNG found under `<root>/<pack>/` for the selected packs.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
    packs: Vec<String>,
}

impl DirectoryProvider {
    pub fn new(root: PathBuf, packs: Vec<String>) -> Self {
        Self { root, packs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packs(&self) -> &[String] {
        &self.packs
    }

    fn pack_files(&self, pack: &str) -> Result<Vec<PathBuf>, ProviderError> {
        let pack_dir = self.root.join(pack);
        if !pack_dir.is_dir() {
            tracing::warn!(pack, dir = %pack_dir.display(), "asset pack directory not found");
            return Ok(Vec::new());
        }

        let pattern = format!("{}/**/*.png", glob::Pattern::escape(&pack_dir.to_string_lossy()));
        let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
        files.sort();
        Ok(files)
    }
}

impl AssetProvider for DirectoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn configure(&mut self, config: &toml::Table) -> Result<(), ProviderError> {
        if let Some(packs) = string_list(PROVIDER_NAME, config, "packs")? {
            self.packs = packs;
        }
        if let Some(value) = config.get("pack_dir") {
            let dir = value.as_str().ok_or_else(|| ProviderError::Configuration {
                provider: PROVIDER_NAME.to_string(),
                message: "'pack_dir' must be a string".to_string(),
            })?;
            self.root = PathBuf::from(dir);
        }
        Ok(())
    }

    fn list_available(&self) -> Result<Vec<AssetSpec>, ProviderError> {
        let mut assets = Vec::new();
        for pack in &self.packs {
            for path in self.pack_files(pack)? {
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                assets.push(AssetSpec::from_name(stem).with_source(path).with_metadata("pack", pack));
            }
        }
        Ok(assets)
    }

    fn fetch(&self, spec: &AssetSpec) -> Result<Vec<u8>, ProviderError> {
        let not_found = || ProviderError::NotFound {
            asset: spec.name.clone(),
            provider: PROVIDER_NAME.to_string(),
        };
        let path = spec.source_path.as_ref().ok_or_else(not_found)?;
        if !path.is_file() {
            return Err(not_found());
        }
        Ok(fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_lists_pngs_in_selected_packs() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "tiles/grass.png", b"g");
        write_file(temp.path(), "tiles/nested/road.png", b"r");
        write_file(temp.path(), "tiles/readme.txt", b"x");
        write_file(temp.path(), "buildings/mill.png", b"m");

        let provider = DirectoryProvider::new(temp.path().to_path_buf(), vec!["tiles".to_string()]);
        let assets = provider.list_available().unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();

        assert_eq!(names, vec!["grass", "road"]);
        assert_eq!(assets[0].metadata["pack"], "tiles");
        assert_eq!(provider.fetch(&assets[1]).unwrap(), b"r");
    }

    #[test]
    fn test_missing_pack_is_empty() {
        let temp = TempDir::new().unwrap();
        let provider = DirectoryProvider::new(temp.path().to_path_buf(), vec!["nope".to_string()]);
        assert!(provider.list_available().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_missing_asset() {
        let temp = TempDir::new().unwrap();
        let provider = DirectoryProvider::new(temp.path().to_path_buf(), vec![]);
        let spec = AssetSpec::from_name("ghost").with_source(temp.path().join("ghost.png"));
        assert!(matches!(provider.fetch(&spec), Err(ProviderError::NotFound { .. })));
    }

    #[test]
    fn test_configure() {
        let mut provider = DirectoryProvider::new(PathBuf::from("."), vec![]);
        let config: toml::Table =
            toml::from_str("packs = [\"tiles\"]\npack_dir = \"vendor/kenney\"").unwrap();
        provider.configure(&config).unwrap();
        assert_eq!(provider.packs(), &["tiles".to_string()]);
        assert_eq!(provider.root(), Path::new("vendor/kenney"));

        let bad: toml::Table = toml::from_str("pack_dir = 3").unwrap();
        assert!(provider.configure(&bad).is_err());
    }
}
