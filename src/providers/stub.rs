//! Offline stand-in for image generation providers.

use super::{string_list, AssetProvider, AssetSpec, ProviderError};
use crate::atlas::generate_placeholder_frames;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

const PROVIDER_NAME: &str = "stub";

/// Produces placeholder PNGs for a configured list of asset names.
#[derive(Debug, Clone, Default)]
pub struct StubProvider {
    assets: Vec<String>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: Vec<String>) -> Self {
        Self { assets }
    }
}

impl AssetProvider for StubProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn configure(&mut self, config: &toml::Table) -> Result<(), ProviderError> {
        if let Some(assets) = string_list(PROVIDER_NAME, config, "assets")? {
            self.assets = assets;
        }
        Ok(())
    }

    fn list_available(&self) -> Result<Vec<AssetSpec>, ProviderError> {
        Ok(self
            .assets
            .iter()
            .map(|name| AssetSpec::from_name(name.as_str()).with_metadata("provider", PROVIDER_NAME))
            .collect())
    }

    fn fetch(&self, spec: &AssetSpec) -> Result<Vec<u8>, ProviderError> {
        let frame = generate_placeholder_frames(1, spec.size).into_iter().next().ok_or_else(|| {
            ProviderError::NotFound { asset: spec.name.clone(), provider: PROVIDER_NAME.to_string() }
        })?;

        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ColorType::Rgba8,
        )?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stub_has_no_assets() {
        assert!(StubProvider::new().list_available().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_produces_png_of_nominal_size() {
        let mut provider = StubProvider::new();
        let config: toml::Table = toml::from_str("assets = [\"worker_idle\", \"farm\"]").unwrap();
        provider.configure(&config).unwrap();

        let assets = provider.list_available().unwrap();
        assert_eq!(assets.len(), 2);

        let bytes = provider.fetch(&assets[1]).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 96));
    }
}
