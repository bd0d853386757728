//! Atlas layout calculation.
//!
//! Two strategies are provided:
//! - **Grid**: uniform direction x frame animation sheets
//! - **Packed**: guillotine bin packing for heterogeneous sprite collections

use super::error::PackingError;
use super::geometry::{next_power_of_two, GuillotineTree, Rectangle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compass order used to name grid rows.
pub const DIRECTION_NAMES: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Size multipliers tried against the initial square estimate.
const SIZE_MULTIPLIERS: [f64; 4] = [1.0, 1.2, 1.5, 2.0];

/// What the packer does when no candidate size can hold every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Return [`PackingError::NoFit`]
    #[default]
    Fail,
    /// Return an empty layout at the maximum size (legacy behavior)
    EmptyLayout,
}

/// Configuration for atlas layout and generation
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    /// Padding between frames in pixels
    pub padding: u32,
    /// Round atlas dimensions up to powers of two
    pub power_of_two: bool,
    /// Maximum atlas dimensions (width, height)
    pub max_size: (u32, u32),
    /// Pixel format recorded in sidecar metadata
    pub format: String,
    /// Behavior when packing cannot place every item
    pub overflow: OverflowPolicy,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            padding: 0,
            power_of_two: true,
            max_size: (2048, 2048),
            format: "RGBA".to_string(),
            overflow: OverflowPolicy::Fail,
        }
    }
}

/// Computed placement of named items in an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    pub positions: BTreeMap<String, Rectangle>,
    /// Total item area divided by atlas area
    pub efficiency: f64,
}

impl AtlasLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, positions: BTreeMap::new(), efficiency: 0.0 }
    }

    pub fn add_item(&mut self, name: impl Into<String>, rect: Rectangle) {
        self.positions.insert(name.into(), rect);
    }

    pub fn item_area(&self) -> u64 {
        self.positions.values().map(Rectangle::area).sum()
    }

    /// Recompute `efficiency` from the item area and current dimensions.
    pub fn calculate_efficiency(&mut self) {
        let total = u64::from(self.width) * u64::from(self.height);
        self.efficiency = if total > 0 { self.item_area() as f64 / total as f64 } else { 0.0 };
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Specification for a unit animation atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    #[serde(default = "default_directions")]
    pub directions: u32,
    #[serde(default = "default_frames_per_direction")]
    pub frames_per_direction: u32,
    #[serde(default = "default_frame_size")]
    pub frame_size: (u32, u32),
}

fn default_directions() -> u32 {
    8
}

fn default_frames_per_direction() -> u32 {
    8
}

fn default_frame_size() -> (u32, u32) {
    (64, 64)
}

impl UnitSpec {
    pub fn new(
        name: impl Into<String>,
        directions: u32,
        frames_per_direction: u32,
        frame_size: (u32, u32),
    ) -> Self {
        Self { name: name.into(), directions, frames_per_direction, frame_size }
    }

    pub fn total_frames(&self) -> usize {
        self.directions as usize * self.frames_per_direction as usize
    }

    /// Frame names in row-major order (direction, then frame index).
    pub fn frame_names(&self) -> Vec<String> {
        (0..self.directions)
            .flat_map(|dir| (0..self.frames_per_direction).map(move |f| frame_name(dir, f)))
            .collect()
    }
}

/// Name of the frame at grid row `direction` and column `frame`.
///
/// Rows beyond the eight compass points fall back to `dir_<index>`.
pub fn frame_name(direction: u32, frame: u32) -> String {
    match DIRECTION_NAMES.get(direction as usize) {
        Some(dir) => format!("walk_{}_{}", dir, frame),
        None => format!("walk_dir_{}_{}", direction, frame),
    }
}

/// Engine for calculating atlas layouts.
#[derive(Debug, Clone, Default)]
pub struct AtlasLayoutEngine {
    config: AtlasConfig,
}

impl AtlasLayoutEngine {
    pub fn new(config: AtlasConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Lay frames out row-major: direction is the row, frame index the column.
    pub fn calculate_grid_layout(&self, spec: &UnitSpec) -> AtlasLayout {
        let (frame_w, frame_h) = spec.frame_size;
        let padding = self.config.padding;

        let mut width = padded_extent(spec.frames_per_direction, frame_w, padding);
        let mut height = padded_extent(spec.directions, frame_h, padding);

        if self.config.power_of_two {
            width = next_power_of_two(width);
            height = next_power_of_two(height);
        }

        let mut layout = AtlasLayout::new(width, height);
        for dir in 0..spec.directions {
            for frame in 0..spec.frames_per_direction {
                let x = frame * (frame_w + padding);
                let y = dir * (frame_h + padding);
                layout.add_item(frame_name(dir, frame), Rectangle::new(x, y, frame_w, frame_h));
            }
        }

        layout.calculate_efficiency();
        layout
    }

    /// Pack `(name, width, height)` items with the guillotine tree.
    ///
    /// Candidate square sizes are derived from `sqrt(total_area) + max_dimension`;
    /// the candidate with the highest efficiency wins. Candidates larger than
    /// `max_size` are skipped.
    pub fn calculate_packed_layout(
        &self,
        items: &[(String, u32, u32)],
    ) -> Result<AtlasLayout, PackingError> {
        if items.is_empty() {
            return Err(PackingError::EmptyInput);
        }
        if let Some((name, width, height)) = items.iter().find(|(_, w, h)| *w == 0 || *h == 0) {
            return Err(PackingError::ZeroArea {
                name: name.clone(),
                width: *width,
                height: *height,
            });
        }

        let mut sorted: Vec<&(String, u32, u32)> = items.iter().collect();
        // Largest area first; ties broken by name so the order is deterministic.
        sorted.sort_by(|a, b| {
            let area_a = u64::from(a.1) * u64::from(a.2);
            let area_b = u64::from(b.1) * u64::from(b.2);
            area_b.cmp(&area_a).then_with(|| a.0.cmp(&b.0))
        });

        let total_area: u64 = sorted.iter().map(|(_, w, h)| u64::from(*w) * u64::from(*h)).sum();
        let max_dim = sorted.iter().map(|(_, w, h)| (*w).max(*h)).max().unwrap_or(0);
        let initial = (total_area as f64).sqrt() as u64 + u64::from(max_dim);

        let (max_w, max_h) = self.config.max_size;
        let mut best: Option<AtlasLayout> = None;

        for multiplier in SIZE_MULTIPLIERS {
            let candidate = (initial as f64 * multiplier) as u64;
            let Ok(mut size) = u32::try_from(candidate) else {
                continue;
            };
            if self.config.power_of_two {
                size = next_power_of_two(size);
            }
            if size > max_w || size > max_h {
                tracing::debug!(size, "skipping candidate atlas size above maximum");
                continue;
            }

            if let Some(layout) = self.try_pack_layout(&sorted, size, size) {
                let better = best.as_ref().map_or(true, |b| layout.efficiency > b.efficiency);
                if better {
                    best = Some(layout);
                }
            }
        }

        match (best, self.config.overflow) {
            (Some(layout), _) => Ok(layout),
            (None, OverflowPolicy::Fail) => {
                Err(PackingError::NoFit { items: items.len(), max: self.config.max_size })
            }
            (None, OverflowPolicy::EmptyLayout) => {
                tracing::warn!(
                    items = items.len(),
                    "no atlas size fits every item, returning an empty layout"
                );
                Ok(AtlasLayout::new(max_w, max_h))
            }
        }
    }

    fn try_pack_layout(
        &self,
        items: &[&(String, u32, u32)],
        width: u32,
        height: u32,
    ) -> Option<AtlasLayout> {
        let mut tree = GuillotineTree::new(width, height);
        let mut layout = AtlasLayout::new(width, height);
        let padding = self.config.padding;

        for (name, item_w, item_h) in items.iter().copied() {
            let slot = tree.insert(item_w + padding, item_h + padding)?;
            layout.add_item(name.clone(), Rectangle::new(slot.x, slot.y, *item_w, *item_h));
        }

        layout.calculate_efficiency();
        Some(layout)
    }

    /// Shrink the atlas to the bounding box of its placed items.
    ///
    /// Power-of-two rounding still applies and the atlas never grows.
    pub fn optimize_atlas_size(&self, layout: &AtlasLayout) -> AtlasLayout {
        if layout.is_empty() {
            return layout.clone();
        }

        let mut max_x = layout.positions.values().map(Rectangle::right).max().unwrap_or(0);
        let mut max_y = layout.positions.values().map(Rectangle::bottom).max().unwrap_or(0);

        if self.config.power_of_two {
            max_x = next_power_of_two(max_x);
            max_y = next_power_of_two(max_y);
        }

        let mut optimized = AtlasLayout {
            width: max_x.min(layout.width),
            height: max_y.min(layout.height),
            positions: layout.positions.clone(),
            efficiency: 0.0,
        };
        optimized.calculate_efficiency();
        optimized
    }
}

/// Extent of `count` cells of `size` separated by `padding`.
fn padded_extent(count: u32, size: u32, padding: u32) -> u32 {
    count * size + count.saturating_sub(1) * padding
}
