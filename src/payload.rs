//! Boundary parsing for collaborator replies
//!
//! Vision and LLM services answer with loosely shaped JSON, often wrapped in
//! markdown fences or prose. These helpers validate a reply into the engine's
//! typed structures so that no open-ended JSON values travel inward.
//! Collaborator implementations call them on the raw model text.
//!
//! Keyed replies are accepted in three shapes:
//! - a list of entries: `[{"id": "text-001", ...}]`
//! - a wrapped list: `{"roles": [{"id": "text-001", ...}]}`
//! - an id map: `{"text-001": ...}`

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::enrich::design::PartialDesignSystem;
use crate::error::{EngineError, Result};
use crate::types::{
    Alignment, Anchor, BoundingBox, LayoutLogic, RawFrameAnalysis, RawTextDetection, Role,
    TextVisuals,
};

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)```").expect("valid fence pattern")
});

/// Pull the JSON document out of a model reply.
///
/// Prefers the first fenced code block; otherwise takes the span from the
/// first `{` or `[` to the last matching closer.
#[must_use]
pub fn extract_json(reply: &str) -> &str {
    if let Some(body) = FENCED.captures(reply).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }

    let start = reply.find(['{', '[']);
    let end = reply.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e >= s => &reply[s..=e],
        _ => reply.trim(),
    }
}

fn decode<T: DeserializeOwned>(reply: &str, what: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(extract_json(reply))?;
    serde_json::from_value(value)
        .map_err(|e| EngineError::Payload(format!("unexpected {what} shape: {e}")))
}

/// A frame as the vision service sent it. Detections and visuals stay raw
/// so one bad entry cannot reject the whole reply.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FramePayload {
    frame_index: u32,
    timestamp: u64,
    #[serde(default)]
    detections: Vec<serde_json::Value>,
    #[serde(default)]
    visuals: serde_json::Value,
}

impl FramePayload {
    fn into_analysis(self) -> RawFrameAnalysis {
        let frame_index = self.frame_index;
        let visuals = if self.visuals.is_null() {
            TextVisuals::default()
        } else {
            serde_json::from_value(self.visuals).unwrap_or_else(|e| {
                debug!(frame_index, error = %e, "unreadable visuals, using none");
                TextVisuals::default()
            })
        };

        RawFrameAnalysis {
            frame_index,
            timestamp: self.timestamp,
            detections: self
                .detections
                .into_iter()
                .map(|value| {
                    DetectionFields::decode(value, frame_index).into_detection(frame_index)
                })
                .collect(),
            visuals,
        }
    }
}

/// Every detection field is optional here. Missing text becomes empty and
/// missing confidence becomes NaN, which grouping counts as malformed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DetectionFields {
    text: Option<String>,
    frame_index: Option<u32>,
    bounding_box: Option<BoundingBox>,
    confidence: Option<f64>,
    language: Option<String>,
}

impl DetectionFields {
    fn decode(value: serde_json::Value, frame_index: u32) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(frame_index, error = %e, "unreadable detection");
            Self::default()
        })
    }

    fn into_detection(self, frame_index: u32) -> RawTextDetection {
        RawTextDetection {
            text: self.text.unwrap_or_default(),
            frame_index: self.frame_index.unwrap_or(frame_index),
            bounding_box: self.bounding_box,
            confidence: self.confidence.unwrap_or(f64::NAN),
            language: self.language,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FramesReply {
    List(Vec<FramePayload>),
    Wrapped { frames: Vec<FramePayload> },
}

/// Parse a vision reply into frame analyses sorted by frame index.
///
/// A frame without `frameIndex` or `timestamp` fails the reply. A detection
/// with missing or mistyped fields is kept in a form that consolidation
/// skips and counts, so the rest of the frame survives.
pub fn parse_frame_analyses(reply: &str) -> Result<Vec<RawFrameAnalysis>> {
    let frames = match decode::<FramesReply>(reply, "frame analysis")? {
        FramesReply::List(frames) | FramesReply::Wrapped { frames } => frames,
    };
    let mut analyses: Vec<RawFrameAnalysis> =
        frames.into_iter().map(FramePayload::into_analysis).collect();
    analyses.sort_by_key(|a| a.frame_index);
    Ok(analyses)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LayoutFields {
    anchor: Option<String>,
    #[serde(alias = "align", alias = "textAlign")]
    alignment: Option<String>,
    padding: Option<f64>,
    margin: Option<f64>,
    #[serde(alias = "z_index", alias = "zindex")]
    z_index: Option<i32>,
}

impl LayoutFields {
    fn into_layout(self, id: &str) -> LayoutLogic {
        let defaults = LayoutLogic::default();
        let anchor = self.anchor.as_deref().and_then(|a| {
            let parsed = Anchor::parse(a);
            if parsed.is_none() {
                debug!(id, anchor = a, "unknown anchor, using default");
            }
            parsed
        });
        LayoutLogic {
            anchor: anchor.unwrap_or(defaults.anchor),
            alignment: self
                .alignment
                .as_deref()
                .and_then(Alignment::parse)
                .unwrap_or(defaults.alignment),
            padding: non_negative(self.padding).unwrap_or(defaults.padding),
            margin: non_negative(self.margin).unwrap_or(defaults.margin),
            z_index: self.z_index.unwrap_or(defaults.z_index),
        }
    }
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

#[derive(Deserialize)]
struct LayoutEntry {
    id: String,
    #[serde(flatten)]
    fields: LayoutFields,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutReply {
    List(Vec<LayoutEntry>),
    Wrapped { layouts: Vec<LayoutEntry> },
    Map(HashMap<String, LayoutFields>),
}

/// Parse a layout reply. Missing or invalid fields take layout defaults.
pub fn parse_layouts(reply: &str) -> Result<HashMap<String, LayoutLogic>> {
    let entries: Vec<(String, LayoutFields)> = match decode::<LayoutReply>(reply, "layout")? {
        LayoutReply::List(list) | LayoutReply::Wrapped { layouts: list } => {
            list.into_iter().map(|e| (e.id, e.fields)).collect()
        }
        LayoutReply::Map(map) => map.into_iter().collect(),
    };
    Ok(entries
        .into_iter()
        .map(|(id, fields)| {
            let layout = fields.into_layout(&id);
            (id, layout)
        })
        .collect())
}

#[derive(Deserialize)]
struct RoleEntry {
    id: String,
    role: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleReply {
    List(Vec<RoleEntry>),
    Wrapped { roles: Vec<RoleEntry> },
    Map(HashMap<String, String>),
}

/// Parse a role reply. Entries with an unrecognised role are dropped, which
/// leaves those ids at the `BODY` default.
pub fn parse_roles(reply: &str) -> Result<HashMap<String, Role>> {
    let entries: Vec<(String, String)> = match decode::<RoleReply>(reply, "role")? {
        RoleReply::List(list) | RoleReply::Wrapped { roles: list } => {
            list.into_iter().map(|e| (e.id, e.role)).collect()
        }
        RoleReply::Map(map) => map.into_iter().collect(),
    };
    Ok(entries
        .into_iter()
        .filter_map(|(id, raw)| match Role::parse(&raw) {
            Some(role) => Some((id, role)),
            None => {
                debug!(id, role = raw, "dropping unknown role");
                None
            }
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DesignReply {
    Wrapped {
        #[serde(rename = "designSystem", alias = "design_system")]
        design_system: PartialDesignSystem,
    },
    Flat(PartialDesignSystem),
}

/// Parse a design-system reply; absent tokens stay `None`.
pub fn parse_design_system(reply: &str) -> Result<PartialDesignSystem> {
    match decode::<DesignReply>(reply, "design system")? {
        DesignReply::Wrapped { design_system } | DesignReply::Flat(design_system) => {
            Ok(design_system)
        }
    }
}

#[derive(Deserialize)]
struct VariationEntry {
    id: String,
    variations: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariationReply {
    List(Vec<VariationEntry>),
    Wrapped { variations: Vec<VariationEntry> },
    Map(HashMap<String, Vec<String>>),
}

/// Parse a variation reply into id -> alternative texts.
pub fn parse_variations(reply: &str) -> Result<HashMap<String, Vec<String>>> {
    Ok(match decode::<VariationReply>(reply, "variation")? {
        VariationReply::List(list) | VariationReply::Wrapped { variations: list } => {
            list.into_iter().map(|e| (e.id, e.variations)).collect()
        }
        VariationReply::Map(map) => map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::consolidate::Consolidator;

    #[test]
    fn extract_json_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nAnything else?";
        assert_eq!(extract_json(reply), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_from_prose() {
        let reply = "Sure! [1, 2, 3] hope that helps";
        assert_eq!(extract_json(reply), "[1, 2, 3]");
        assert_eq!(extract_json("  {}  "), "{}");
    }

    #[test]
    fn parse_frames_sorts_by_index() {
        let reply = r#"{"frames": [
            {"frameIndex": 1, "timestamp": 500, "detections": []},
            {"frameIndex": 0, "timestamp": 0, "detections": [
                {"text": "HI", "frameIndex": 0, "confidence": 0.8,
                 "boundingBox": {"x": 1, "y": 2, "width": 3, "height": 4}}
            ], "visuals": {"fontFamily": "Inter"}}
        ]}"#;

        let frames = parse_frame_analyses(reply).unwrap();

        assert_eq!(frames[0].frame_index, 0);
        assert_eq!(frames[0].detections.len(), 1);
        assert_eq!(frames[0].visuals.font_family.as_deref(), Some("Inter"));
        assert!(frames[1].visuals.is_empty());
    }

    #[test]
    fn bad_detection_does_not_reject_the_reply() {
        let reply = r#"[
            {"frameIndex": 0, "timestamp": 0, "detections": [
                {"text": "SALE", "frameIndex": 0, "confidence": 0.9,
                 "boundingBox": {"x": 10, "y": 80, "width": 30, "height": 8}},
                {"text": "SALE", "frameIndex": 0,
                 "boundingBox": {"x": 50, "y": 20, "width": 30, "height": 8}}
            ]},
            {"frameIndex": 1, "timestamp": 500, "detections": [
                {"text": "SALE", "confidence": 0.8,
                 "boundingBox": {"x": 10, "y": 80, "width": 30, "height": 8}}
            ]}
        ]"#;

        let frames = parse_frame_analyses(reply).unwrap();

        assert_eq!(frames[0].detections.len(), 2);
        assert!(frames[0].detections[1].confidence.is_nan());
        assert_eq!(frames[1].detections[0].frame_index, 1);

        let consolidation = Consolidator::new(&EngineConfig::default()).consolidate(&frames);
        assert_eq!(consolidation.skipped_detections, 1);
        assert_eq!(consolidation.instances.len(), 1);
        assert_eq!(consolidation.instances[0].detection_count, 2);
    }

    #[test]
    fn mistyped_detection_and_visuals_degrade() {
        let reply = r#"{"frames": [
            {"frameIndex": 2, "timestamp": 1000, "detections": [
                "SALE",
                {"text": 42, "confidence": 0.9}
            ], "visuals": "bold"}
        ]}"#;

        let frames = parse_frame_analyses(reply).unwrap();

        assert_eq!(frames[0].detections.len(), 2);
        assert!(frames[0].detections.iter().all(|d| d.text.is_empty()));
        assert!(frames[0].visuals.is_empty());
    }

    #[test]
    fn frame_without_index_is_a_payload_error() {
        let err = parse_frame_analyses(r#"[{"timestamp": 0, "detections": []}]"#).unwrap_err();
        assert!(matches!(err, EngineError::Payload(_)));
    }

    #[test]
    fn parse_layouts_in_every_shape() {
        let list = r#"[{"id": "text-001", "anchor": "bottom_center", "zIndex": 3}]"#;
        let wrapped = r#"{"layouts": [{"id": "text-001", "anchor": "Bottom Center", "zIndex": 3}]}"#;
        let map = r#"{"text-001": {"anchor": "bottom-center", "z_index": 3}}"#;

        for reply in [list, wrapped, map] {
            let layouts = parse_layouts(reply).unwrap();
            let layout = layouts["text-001"];
            assert_eq!(layout.anchor, Anchor::BottomCenter, "{reply}");
            assert_eq!(layout.z_index, 3);
            assert_eq!(layout.alignment, Alignment::Center);
        }
    }

    #[test]
    fn invalid_layout_fields_take_defaults() {
        let reply = r#"{"text-002": {"anchor": "upside", "padding": -4, "margin": 12}}"#;
        let layout = parse_layouts(reply).unwrap()["text-002"];
        assert_eq!(layout.anchor, Anchor::Center);
        assert_eq!(layout.padding, 0.0);
        assert_eq!(layout.margin, 12.0);
        assert_eq!(layout.z_index, 1);
    }

    #[test]
    fn parse_roles_drops_unknown() {
        let reply = "```json\n{\"text-001\": \"hook\", \"text-002\": \"headline\", \"text-003\": \"CTA\"}\n```";
        let roles = parse_roles(reply).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles["text-001"], Role::Hook);
        assert_eq!(roles["text-003"], Role::Cta);
    }

    #[test]
    fn parse_roles_from_list() {
        let reply = r#"{"roles": [{"id": "text-001", "role": "Body"}]}"#;
        assert_eq!(parse_roles(reply).unwrap()["text-001"], Role::Body);
    }

    #[test]
    fn parse_design_system_wrapped_or_flat() {
        let wrapped = r##"{"designSystem": {"fontFamily": "Poppins", "accentColor": "#FF0"}}"##;
        let flat = r##"{"fontFamily": "Poppins", "accentColor": "#FF0"}"##;
        for reply in [wrapped, flat] {
            let design = parse_design_system(reply).unwrap();
            assert_eq!(design.font_family.as_deref(), Some("Poppins"));
            assert_eq!(design.accent_color.as_deref(), Some("#FF0"));
            assert!(design.spacing_base.is_none());
        }
    }

    #[test]
    fn parse_variations_shapes() {
        let map = r#"{"text-001": ["Wait for it", "You won't believe this"]}"#;
        let list = r#"[{"id": "text-001", "variations": ["Wait for it", "You won't believe this"]}]"#;
        for reply in [map, list] {
            let variations = parse_variations(reply).unwrap();
            assert_eq!(variations["text-001"].len(), 2);
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_roles("{not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn wrong_shape_is_a_payload_error() {
        let err = parse_variations(r#"{"text-001": 42}"#).unwrap_err();
        assert!(matches!(err, EngineError::Payload(_)));
    }
}
