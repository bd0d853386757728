//! Texture atlas layout, packing and rasterization.
//!
//! Grid layouts serve uniform direction x frame animation sheets. Guillotine
//! packing serves heterogeneous sprite collections. Both feed
//! [`AtlasGenerator`], which produces the atlas image and its frame map.

mod error;
mod generator;
mod geometry;
mod layout;
mod validate;

pub use error::PackingError;
pub use generator::{
    generate_placeholder_frames, has_transparency, AtlasGenerator, AtlasResult, AtlasSidecar,
    FrameRect, SavedAtlas, SidecarFormat, SidecarMeta, SidecarSize, SpriteInput,
    WORKER_ATLAS_SIZE, WORKER_DIRECTIONS, WORKER_FRAMES_PER_DIRECTION, WORKER_FRAME_SIZE,
};
pub use geometry::{is_power_of_two, next_power_of_two, GuillotineTree, LayoutNode, Rectangle};
pub use layout::{
    frame_name, AtlasConfig, AtlasLayout, AtlasLayoutEngine, OverflowPolicy, UnitSpec,
    DIRECTION_NAMES,
};
pub use validate::{AtlasValidator, AtlasView, IssueKind, Severity, ValidationIssue};
