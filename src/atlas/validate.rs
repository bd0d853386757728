//! Consistency checks for generated atlases
//!
//! Validation never fails fast: every check appends issues so a single pass
//! reports everything wrong with an atlas.

use super::generator::{AtlasResult, AtlasSidecar, FrameRect, WORKER_ATLAS_SIZE, WORKER_FRAME_SIZE};
use super::geometry::{is_power_of_two, Rectangle};
use super::layout::{AtlasConfig, AtlasLayoutEngine, UnitSpec};
use image::RgbaImage;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Type of validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Zero-sized atlas
    InvalidDimensions,
    /// Atlas larger than the configured maximum
    ExceedsMaxSize,
    /// Atlas dimension is not a power of two while rounding is enabled
    NotPowerOfTwo,
    /// Atlas size differs from what the layout would produce
    SizeMismatch,
    /// Frame has zero width or height
    EmptyFrame,
    /// Frame extends past the atlas edge
    OutOfBounds,
    /// Frame contains no visible pixels
    TransparentFrame,
    /// Frame count differs from the unit spec
    FrameCountMismatch,
    /// Expected animation frame name is absent
    MissingFrame,
    /// Required metadata key is absent or has the wrong value
    Metadata,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueKind::InvalidDimensions => "invalid_dimensions",
            IssueKind::ExceedsMaxSize => "exceeds_max_size",
            IssueKind::NotPowerOfTwo => "not_power_of_two",
            IssueKind::SizeMismatch => "size_mismatch",
            IssueKind::EmptyFrame => "empty_frame",
            IssueKind::OutOfBounds => "out_of_bounds",
            IssueKind::TransparentFrame => "transparent_frame",
            IssueKind::FrameCountMismatch => "frame_count",
            IssueKind::MissingFrame => "missing_frame",
            IssueKind::Metadata => "metadata",
        };
        write!(f, "{}", name)
    }
}

/// A problem found in an atlas
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    /// Frame the issue refers to, if any
    pub frame: Option<String>,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, kind, message: message.into(), frame: None }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, kind, message: message.into(), frame: None }
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.kind, self.message)
    }
}

/// Borrowed view of an atlas, either freshly generated or loaded from disk.
#[derive(Debug, Clone, Copy)]
pub struct AtlasView<'a> {
    pub image: &'a RgbaImage,
    pub frames: &'a BTreeMap<String, FrameRect>,
    pub metadata: &'a BTreeMap<String, Value>,
}

impl<'a> From<&'a AtlasResult> for AtlasView<'a> {
    fn from(result: &'a AtlasResult) -> Self {
        Self { image: &result.atlas, frames: &result.frame_map, metadata: &result.metadata }
    }
}

impl<'a> AtlasView<'a> {
    pub fn from_sidecar(image: &'a RgbaImage, sidecar: &'a AtlasSidecar) -> Self {
        Self { image, frames: &sidecar.frames, metadata: &sidecar.meta.extra }
    }

    fn is_worker(&self) -> bool {
        self.metadata.get("atlas_type").and_then(Value::as_str) == Some("worker_animation")
    }
}

/// Validator for atlas generation results.
#[derive(Debug, Clone, Default)]
pub struct AtlasValidator {
    config: AtlasConfig,
}

impl AtlasValidator {
    pub fn new(config: AtlasConfig) -> Self {
        Self { config }
    }

    pub fn validate_dimensions(
        &self,
        atlas: &RgbaImage,
        expected: Option<(u32, u32)>,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let (width, height) = atlas.dimensions();
        let (max_w, max_h) = self.config.max_size;

        if width == 0 || height == 0 {
            issues.push(ValidationIssue::error(
                IssueKind::InvalidDimensions,
                format!("Atlas has invalid dimensions: {}x{}", width, height),
            ));
        }
        if width > max_w || height > max_h {
            issues.push(ValidationIssue::error(
                IssueKind::ExceedsMaxSize,
                format!("Atlas size {}x{} exceeds maximum {}x{}", width, height, max_w, max_h),
            ));
        }
        if let Some((ew, eh)) = expected {
            if (width, height) != (ew, eh) {
                issues.push(ValidationIssue::error(
                    IssueKind::SizeMismatch,
                    format!("Atlas size {}x{} does not match expected {}x{}", width, height, ew, eh),
                ));
            }
        }
        if self.config.power_of_two {
            for (axis, value) in [("width", width), ("height", height)] {
                if !is_power_of_two(value) {
                    issues.push(ValidationIssue::error(
                        IssueKind::NotPowerOfTwo,
                        format!("Atlas {} {} is not a power of two", axis, value),
                    ));
                }
            }
        }

        issues
    }

    pub fn validate_frame_boundaries(
        &self,
        atlas: &RgbaImage,
        frames: &BTreeMap<String, FrameRect>,
    ) -> Vec<ValidationIssue> {
        let (atlas_w, atlas_h) = atlas.dimensions();
        let mut issues = Vec::new();

        for (name, frame) in frames {
            if frame.w == 0 || frame.h == 0 {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::EmptyFrame,
                        format!("Frame '{}' has invalid dimensions: {}x{}", name, frame.w, frame.h),
                    )
                    .with_frame(name),
                );
            }
            let right = u64::from(frame.x) + u64::from(frame.w);
            let bottom = u64::from(frame.y) + u64::from(frame.h);
            if right > u64::from(atlas_w) {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::OutOfBounds,
                        format!("Frame '{}' extends beyond atlas width: {} > {}", name, right, atlas_w),
                    )
                    .with_frame(name),
                );
            }
            if bottom > u64::from(atlas_h) {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::OutOfBounds,
                        format!("Frame '{}' extends beyond atlas height: {} > {}", name, bottom, atlas_h),
                    )
                    .with_frame(name),
                );
            }
        }

        issues
    }

    /// Flag frames whose every pixel has zero alpha.
    pub fn validate_frame_content(
        &self,
        atlas: &RgbaImage,
        frames: &BTreeMap<String, FrameRect>,
    ) -> Vec<ValidationIssue> {
        let bounds = Rectangle::new(0, 0, atlas.width(), atlas.height());
        frames
            .iter()
            .filter(|(_, frame)| bounds.contains_rect(&Rectangle::from(**frame)))
            .filter(|(_, frame)| is_fully_transparent(atlas, frame))
            .map(|(name, _)| {
                ValidationIssue::warning(
                    IssueKind::TransparentFrame,
                    format!("Frame '{}' is completely transparent", name),
                )
                .with_frame(name)
            })
            .collect()
    }

    /// Check frame count and naming against a unit spec.
    pub fn validate_unit_frames(&self, view: AtlasView<'_>, spec: &UnitSpec) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if view.frames.len() != spec.total_frames() {
            issues.push(ValidationIssue::error(
                IssueKind::FrameCountMismatch,
                format!(
                    "Frame count {} does not match expected {}",
                    view.frames.len(),
                    spec.total_frames()
                ),
            ));
        }
        for name in spec.frame_names() {
            if !view.frames.contains_key(&name) {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::MissingFrame,
                        format!("Missing expected frame: {}", name),
                    )
                    .with_frame(name),
                );
            }
        }
        if !view.metadata.contains_key("unit_name") {
            issues.push(ValidationIssue::error(
                IssueKind::Metadata,
                "Missing required metadata: unit_name",
            ));
        }

        issues
    }

    /// Worker atlases must be 512x512 with 64 frames of 64x64 and worker metadata.
    pub fn validate_worker_atlas(&self, view: AtlasView<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let (width, height) = view.image.dimensions();

        if (width, height) != WORKER_ATLAS_SIZE {
            issues.push(ValidationIssue::error(
                IssueKind::SizeMismatch,
                format!(
                    "Worker atlas size {}x{} is not {}x{}",
                    width, height, WORKER_ATLAS_SIZE.0, WORKER_ATLAS_SIZE.1
                ),
            ));
        }
        if view.frames.len() != 64 {
            issues.push(ValidationIssue::error(
                IssueKind::FrameCountMismatch,
                format!("Worker atlas has {} frames, expected 64", view.frames.len()),
            ));
        }
        for (name, frame) in view.frames {
            if (frame.w, frame.h) != WORKER_FRAME_SIZE {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::SizeMismatch,
                        format!("Worker frame '{}' size {}x{} is not 64x64", name, frame.w, frame.h),
                    )
                    .with_frame(name),
                );
            }
        }

        let expected = [
            ("atlas_type", json!("worker_animation")),
            ("target_size", json!([WORKER_ATLAS_SIZE.0, WORKER_ATLAS_SIZE.1])),
            ("frame_layout", json!("8x8_grid")),
            ("animation_type", json!("walking")),
        ];
        for (key, value) in expected {
            match view.metadata.get(key) {
                None => issues.push(ValidationIssue::error(
                    IssueKind::Metadata,
                    format!("Missing worker metadata: {}", key),
                )),
                Some(actual) if *actual != value => issues.push(ValidationIssue::error(
                    IssueKind::Metadata,
                    format!("Worker metadata '{}' is {}, expected {}", key, actual, value),
                )),
                Some(_) => {}
            }
        }

        issues
    }

    /// Run every applicable check.
    ///
    /// The expected size is derived from the grid layout when a unit spec is
    /// given; worker atlases are checked against their fixed canvas instead.
    pub fn validate(&self, view: AtlasView<'_>, spec: Option<&UnitSpec>) -> Vec<ValidationIssue> {
        let worker = view.is_worker() || spec.is_some_and(|s| s.name == "worker");

        let expected = match spec {
            Some(spec) if !worker => {
                let engine = AtlasLayoutEngine::new(self.config.clone());
                let layout = engine.calculate_grid_layout(spec);
                Some((layout.width, layout.height))
            }
            _ => None,
        };

        let mut issues = self.validate_dimensions(view.image, expected);
        issues.extend(self.validate_frame_boundaries(view.image, view.frames));
        issues.extend(self.validate_frame_content(view.image, view.frames));
        if let Some(spec) = spec {
            issues.extend(self.validate_unit_frames(view, spec));
        }
        if worker {
            issues.extend(self.validate_worker_atlas(view));
        }
        issues
    }
}

fn is_fully_transparent(atlas: &RgbaImage, frame: &FrameRect) -> bool {
    (frame.y..frame.y + frame.h)
        .all(|y| (frame.x..frame.x + frame.w).all(|x| atlas.get_pixel(x, y).0[3] == 0))
}
