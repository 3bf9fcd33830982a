//! Data model shared by every stage of the engine.
//!
//! Raw types (`RawTextDetection`, `RawFrameAnalysis`) arrive from the vision
//! collaborator and are never mutated. Consolidated and enriched types are
//! built fresh by each stage; an [`EnrichedOverlay`] wraps its source
//! [`ConsolidatedTextInstance`] by value rather than editing it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in percent-of-frame coordinates (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when every coordinate is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// True when origin and size are all within `0.0..=100.0`. Rejects
    /// non-finite values and pixel-scale boxes.
    #[must_use]
    pub fn is_in_frame(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=100.0).contains(v))
    }
}

/// One OCR hit from one frame.
///
/// `bounding_box` is optional at the boundary: upstream vision output is
/// best-effort and detections without a position are skipped during grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTextDetection {
    pub text: String,
    pub frame_index: u32,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    /// OCR confidence in `0.0..=1.0`. NaN when the vision reply omitted it;
    /// such detections are skipped during grouping.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Typography and styling hints for a frame. Every field is best-effort.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVisuals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_transform: Option<String>,
}

impl TextVisuals {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Vision output for a single extracted frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrameAnalysis {
    pub frame_index: u32,
    /// Milliseconds from the start of the video
    pub timestamp: u64,
    #[serde(default)]
    pub detections: Vec<RawTextDetection>,
    #[serde(default)]
    pub visuals: TextVisuals,
}

/// A decoded frame handed to the vision collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInput {
    pub index: u32,
    pub timestamp_ms: u64,
    /// Path to the frame image on disk
    pub path: PathBuf,
}

/// Position sample within a motion path. `time` is seconds relative to the
/// owning instance's start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionKeyframe {
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

/// Motion classification produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionType {
    Static,
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    PopIn,
}

impl MotionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "STATIC",
            Self::Linear => "LINEAR",
            Self::EaseIn => "EASE_IN",
            Self::EaseOut => "EASE_OUT",
            Self::EaseInOut => "EASE_IN_OUT",
            Self::PopIn => "POP_IN",
        }
    }
}

/// Ordered keyframes plus their classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionPath {
    pub keyframes: Vec<MotionKeyframe>,
    #[serde(rename = "type")]
    pub motion_type: MotionType,
    /// Sum of the population variances of x and y (percent squared)
    pub variance: f64,
}

/// One logical on-screen text element spanning several frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedTextInstance {
    pub id: String,
    pub text: String,
    pub start_frame: u32,
    pub end_frame: u32,
    /// Seconds
    pub start_time: f64,
    /// Seconds
    pub end_time: f64,
    /// Seconds, floored at the configured minimum
    pub duration: f64,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_path: Option<MotionPath>,
    pub visuals: TextVisuals,
    pub detection_confidence: f64,
    /// Number of distinct frames the text was detected in (at least the
    /// configured `min_detections`)
    pub detection_count: usize,
}

/// Narrative function of a text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Hook,
    #[default]
    Body,
    Cta,
}

impl Role {
    /// Lenient parse of collaborator output ("hook", "CTA", "call to action").
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        match normalized.as_str() {
            "hook" => Some(Self::Hook),
            "body" => Some(Self::Body),
            "cta" | "calltoaction" => Some(Self::Cta),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hook => "HOOK",
            Self::Body => "BODY",
            Self::Cta => "CTA",
        }
    }

    /// Roles that receive copy variations.
    #[must_use]
    pub fn wants_variations(&self) -> bool {
        matches!(self, Self::Hook | Self::Cta)
    }
}

/// Where an overlay is pinned on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[default]
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// Lenient parse accepting `bottom-center`, `bottom_center`, `Bottom Center`,
    /// and the bare `top`/`bottom`/`left`/`right` shorthands.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        match key.as_str() {
            "topleft" => Some(Self::TopLeft),
            "topcenter" | "top" => Some(Self::TopCenter),
            "topright" => Some(Self::TopRight),
            "middleleft" | "centerleft" | "left" => Some(Self::MiddleLeft),
            "center" | "middle" | "middlecenter" => Some(Self::Center),
            "middleright" | "centerright" | "right" => Some(Self::MiddleRight),
            "bottomleft" => Some(Self::BottomLeft),
            "bottomcenter" | "bottom" => Some(Self::BottomCenter),
            "bottomright" => Some(Self::BottomRight),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::MiddleLeft => "middle-left",
            Self::Center => "center",
            Self::MiddleRight => "middle-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }
}

/// Horizontal text alignment inside the overlay box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" | "centre" | "middle" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Layout decision for one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutLogic {
    pub anchor: Anchor,
    pub alignment: Alignment,
    pub padding: f64,
    pub margin: f64,
    pub z_index: i32,
}

impl Default for LayoutLogic {
    fn default() -> Self {
        Self {
            anchor: Anchor::Center,
            alignment: Alignment::Center,
            padding: 0.0,
            margin: 0.0,
            z_index: 1,
        }
    }
}

/// A consolidated instance plus role and layout enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedOverlay {
    #[serde(flatten)]
    pub instance: ConsolidatedTextInstance,
    pub role: Role,
    pub layout: LayoutLogic,
}

/// Resolved design tokens. Every field is populated; missing collaborator
/// values are replaced by fallbacks in [`crate::enrich::design`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSystem {
    pub font_family: String,
    pub heading_font: String,
    pub primary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub spacing_base: u32,
    pub border_radius: u32,
}

/// Final artifact handed to rendering and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub project_id: String,
    pub overlays: Vec<EnrichedOverlay>,
    pub design_system: DesignSystem,
    pub variations: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
}
