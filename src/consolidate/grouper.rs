//! Temporal grouping of raw detections
//!
//! Clusters every detection of a frame batch into groups believed to be the
//! same on-screen text element. Exact grouping keys on [`normalize`] and runs
//! in one pass over a key index; the optional fuzzy pass then folds groups
//! whose keys are within edit-distance similarity of an earlier group.
//!
//! A group holds at most one detection per frame. When OCR reports the same
//! text twice in one frame, only the most confident reading is kept, so group
//! size is the number of distinct frames the text was seen in.

use std::collections::HashMap;

use tracing::debug;

use super::normalize::{normalize, similarity};
use crate::config::{GroupingConfig, GroupingStrategy};
use crate::types::{RawFrameAnalysis, RawTextDetection};

/// Detections believed to describe one text element, in frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionGroup {
    /// Normalized key of the group's first detection
    pub key: String,
    pub members: Vec<RawTextDetection>,
}

impl DetectionGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn first_frame(&self) -> u32 {
        self.members.first().map_or(u32::MAX, |d| d.frame_index)
    }
}

/// Result of grouping a frame batch
#[derive(Debug, Clone, Default)]
pub struct GroupingOutcome {
    pub groups: Vec<DetectionGroup>,
    /// Detections dropped for missing, non-finite or out-of-range fields
    pub skipped: usize,
    /// Whether the similarity pass ran
    pub fuzzy_applied: bool,
}

/// Groups detections across frames
pub struct TemporalGrouper {
    config: GroupingConfig,
}

impl TemporalGrouper {
    #[must_use]
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Group all detections of `analyses`, which must be in frame order.
    #[must_use]
    pub fn group(&self, analyses: &[RawFrameAnalysis]) -> GroupingOutcome {
        let mut skipped = 0;
        let detections = analyses
            .iter()
            .flat_map(|frame| frame.detections.iter())
            .filter_map(|detection| match usable_key(detection) {
                Some(key) => Some((key, detection)),
                None => {
                    skipped += 1;
                    None
                }
            });

        let groups = collapse_same_frame(group_exact(detections));

        let fuzzy_applied = match self.config.strategy {
            GroupingStrategy::Exact => false,
            GroupingStrategy::Fuzzy => true,
            GroupingStrategy::Adaptive => self.too_many_singletons(&groups),
        };

        let groups = if fuzzy_applied {
            collapse_same_frame(merge_similar(groups, self.config.fuzzy_threshold))
        } else {
            groups
        };

        GroupingOutcome {
            groups,
            skipped,
            fuzzy_applied,
        }
    }

    fn too_many_singletons(&self, groups: &[DetectionGroup]) -> bool {
        if groups.len() < 2 {
            return false;
        }
        let singletons = groups.iter().filter(|g| g.len() == 1).count();
        let ratio = singletons as f64 / groups.len() as f64;
        debug!(singletons, groups = groups.len(), ratio, "singleton ratio");
        ratio >= self.config.singleton_ratio
    }
}

/// Normalized key for a well-formed detection, `None` for one to skip.
///
/// Confidence must lie in `0.0..=1.0` and the box inside the frame's
/// percent coordinates.
fn usable_key(detection: &RawTextDetection) -> Option<String> {
    let bbox = detection.bounding_box.as_ref()?;
    if !bbox.is_in_frame() || !(0.0..=1.0).contains(&detection.confidence) {
        return None;
    }
    let key = normalize(&detection.text);
    (!key.is_empty()).then_some(key)
}

/// One pass over detections, keyed by normalized text. Groups come out in
/// order of first appearance and members stay in arrival (frame) order.
fn group_exact<'a>(
    detections: impl Iterator<Item = (String, &'a RawTextDetection)>,
) -> Vec<DetectionGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<DetectionGroup> = Vec::new();

    for (key, detection) in detections {
        if let Some(&slot) = index.get(&key) {
            groups[slot].members.push(detection.clone());
        } else {
            index.insert(key.clone(), groups.len());
            groups.push(DetectionGroup {
                key,
                members: vec![detection.clone()],
            });
        }
    }

    groups
}

/// Keep one detection per frame in every group: the most confident, the
/// earliest reported on a tie. Members come out in frame order.
fn collapse_same_frame(groups: Vec<DetectionGroup>) -> Vec<DetectionGroup> {
    groups
        .into_iter()
        .map(|mut group| {
            group.members.sort_by_key(|d| d.frame_index);
            let before = group.members.len();
            let mut kept: Vec<RawTextDetection> = Vec::with_capacity(before);
            for detection in group.members {
                match kept.last_mut() {
                    Some(last) if last.frame_index == detection.frame_index => {
                        if detection.confidence > last.confidence {
                            *last = detection;
                        }
                    }
                    _ => kept.push(detection),
                }
            }
            if kept.len() < before {
                debug!(
                    key = %group.key,
                    dropped = before - kept.len(),
                    "collapsed same-frame duplicates"
                );
            }
            DetectionGroup {
                key: group.key,
                members: kept,
            }
        })
        .collect()
}

/// Fold each group into the most similar earlier group at or above
/// `threshold`, then restore frame order inside every merged group.
fn merge_similar(groups: Vec<DetectionGroup>, threshold: f64) -> Vec<DetectionGroup> {
    let mut merged: Vec<DetectionGroup> = Vec::with_capacity(groups.len());

    for group in groups {
        let best = merged
            .iter()
            .enumerate()
            .map(|(i, existing)| (i, similarity(&existing.key, &group.key)))
            .filter(|(_, score)| *score >= threshold)
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, best_score)) if best_score >= candidate.1 => best,
                _ => Some(candidate),
            });

        match best {
            Some((slot, score)) => {
                debug!(
                    from = %group.key,
                    into = %merged[slot].key,
                    score,
                    "fuzzy merge"
                );
                merged[slot].members.extend(group.members);
            }
            None => merged.push(group),
        }
    }

    for group in &mut merged {
        group.members.sort_by_key(|d| d.frame_index);
    }
    merged.sort_by_key(DetectionGroup::first_frame);

    merged
}
