//! Errors raised while laying out or rasterizing atlases.

/// Error during atlas layout or generation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PackingError {
    /// Input frame count does not match the unit specification
    #[error("Expected {expected} frames, got {actual}")]
    FrameCount { expected: usize, actual: usize },
    /// A frame has the wrong dimensions
    #[error("Frame {index} has size {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    FrameSize { index: usize, expected: (u32, u32), actual: (u32, u32) },
    /// Layout is larger than the configured maximum
    #[error("Atlas size {width}x{height} exceeds maximum {}x{}", .max.0, .max.1)]
    ExceedsMaxSize { width: u32, height: u32, max: (u32, u32) },
    /// No sprites were supplied
    #[error("No sprites provided for atlas generation")]
    EmptyInput,
    /// An item has zero width or height
    #[error("Item '{name}' has zero area ({width}x{height})")]
    ZeroArea { name: String, width: u32, height: u32 },
    /// Two sprites share a name, so one would be lost from the frame map
    #[error("Duplicate sprite name '{0}'")]
    DuplicateName(String),
    /// No candidate atlas size could hold every item
    #[error("Could not fit {items} items into an atlas of at most {}x{}", .max.0, .max.1)]
    NoFit { items: usize, max: (u32, u32) },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// JSON sidecar error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML sidecar write error
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    /// TOML sidecar read error
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
