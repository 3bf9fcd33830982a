//! Consolidated instance construction
//!
//! Turns a surviving detection group into a [`ConsolidatedTextInstance`].
//! Groups seen in fewer distinct frames than the corroboration minimum are
//! noise and produce nothing; repeated hits within one frame do not count.
//!
//! The canonical label is the text of the single highest-confidence member,
//! not a majority vote, so one confident misread can name the instance.
//! Visuals and `detection_confidence` come from that same member.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::bbox::aggregate;
use super::grouper::DetectionGroup;
use super::motion::MotionSynthesizer;
use crate::types::{BoundingBox, ConsolidatedTextInstance, RawFrameAnalysis, RawTextDetection, TextVisuals};

/// Frame index to visuals lookup for a batch of analyses
pub struct FrameVisuals<'a> {
    by_frame: HashMap<u32, &'a TextVisuals>,
}

impl<'a> FrameVisuals<'a> {
    #[must_use]
    pub fn from_analyses(analyses: &'a [RawFrameAnalysis]) -> Self {
        Self {
            by_frame: analyses
                .iter()
                .map(|a| (a.frame_index, &a.visuals))
                .collect(),
        }
    }

    /// Visuals recorded for `frame_index`, or an empty set if the frame is unknown.
    #[must_use]
    pub fn get(&self, frame_index: u32) -> TextVisuals {
        self.by_frame
            .get(&frame_index)
            .map(|v| (*v).clone())
            .unwrap_or_default()
    }
}

/// Builds instances from detection groups
pub struct InstanceBuilder {
    fps: f64,
    min_detections: usize,
    min_duration: f64,
    motion: MotionSynthesizer,
}

impl InstanceBuilder {
    #[must_use]
    pub fn new(fps: f64, min_detections: usize, min_duration: f64, motion: MotionSynthesizer) -> Self {
        Self {
            fps,
            min_detections,
            min_duration,
            motion,
        }
    }

    /// Build an instance for `group`, or `None` if it is noise.
    #[must_use]
    pub fn build(
        &self,
        id: String,
        group: &DetectionGroup,
        visuals: &FrameVisuals<'_>,
    ) -> Option<ConsolidatedTextInstance> {
        let frames = distinct_frames(&group.members);
        if frames < self.min_detections {
            debug!(
                key = %group.key,
                detections = group.len(),
                frames,
                "dropping uncorroborated group"
            );
            return None;
        }

        let top = most_confident(&group.members)?;
        let start_frame = group.members.iter().map(|d| d.frame_index).min()?;
        let end_frame = group.members.iter().map(|d| d.frame_index).max()?;

        let start_time = f64::from(start_frame) / self.fps;
        let end_time = f64::from(end_frame) / self.fps;

        let boxes: Vec<BoundingBox> = group.members.iter().filter_map(|d| d.bounding_box).collect();
        if boxes.is_empty() {
            return None;
        }

        Some(ConsolidatedTextInstance {
            id,
            text: top.text.trim().to_string(),
            start_frame,
            end_frame,
            start_time,
            end_time,
            duration: (end_time - start_time).max(self.min_duration),
            bounding_box: aggregate(&boxes),
            motion_path: Some(self.motion.synthesize(&group.members, self.fps, start_time)),
            visuals: visuals.get(top.frame_index),
            detection_confidence: top.confidence,
            detection_count: frames,
        })
    }
}

fn distinct_frames(members: &[RawTextDetection]) -> usize {
    members
        .iter()
        .map(|d| d.frame_index)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Highest-confidence member; the earliest wins a tie.
fn most_confident(members: &[RawTextDetection]) -> Option<&RawTextDetection> {
    members
        .iter()
        .reduce(|best, d| if d.confidence > best.confidence { d } else { best })
}
