//! Temporal text consolidation
//!
//! Reduces noisy, independent per-frame OCR output to one timeline of text
//! elements:
//! - Normalization (case, punctuation, whitespace)
//! - Temporal grouping (exact key, optional fuzzy pass)
//! - Bounding-box aggregation
//! - Motion-path synthesis and classification
//! - Instance building with the two-detection noise filter
//!
//! Everything here is synchronous and pure: identical analyses and config
//! always yield identical instances, ids included.

pub mod bbox;
pub mod grouper;
pub mod instance;
pub mod motion;
pub mod normalize;

use tracing::info;

pub use bbox::aggregate;
pub use grouper::{DetectionGroup, GroupingOutcome, TemporalGrouper};
pub use instance::{FrameVisuals, InstanceBuilder};
pub use motion::{population_variance, MotionSynthesizer, UiEasing, UiMotionPath};
pub use normalize::{levenshtein, normalize, similarity};

use crate::config::EngineConfig;
use crate::types::{ConsolidatedTextInstance, RawFrameAnalysis};

/// Output of a consolidation run
#[derive(Debug, Clone, Default)]
pub struct Consolidation {
    /// Instances ordered by start frame, ids `text-001`, `text-002`, ...
    pub instances: Vec<ConsolidatedTextInstance>,
    /// Groups formed before the noise filter
    pub group_count: usize,
    /// Groups dropped as uncorroborated
    pub noise_dropped: usize,
    /// Malformed detections skipped during grouping
    pub skipped_detections: usize,
    pub fuzzy_applied: bool,
}

/// Runs grouping, aggregation, motion synthesis and instance building
pub struct Consolidator {
    grouper: TemporalGrouper,
    builder: InstanceBuilder,
}

impl Consolidator {
    /// Create a consolidator. `config` is expected to be validated.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            grouper: TemporalGrouper::new(config.grouping.clone()),
            builder: InstanceBuilder::new(
                config.fps,
                config.min_detections,
                config.min_duration,
                MotionSynthesizer::new(config.motion.clone()),
            ),
        }
    }

    /// Consolidate frame analyses, which must be sorted by frame index.
    #[must_use]
    pub fn consolidate(&self, analyses: &[RawFrameAnalysis]) -> Consolidation {
        let outcome = self.grouper.group(analyses);
        let visuals = FrameVisuals::from_analyses(analyses);

        let mut groups: Vec<&DetectionGroup> = outcome.groups.iter().collect();
        groups.sort_by_key(|g| g.members.iter().map(|d| d.frame_index).min());

        let mut instances = Vec::new();
        for group in groups {
            let id = instance_id(instances.len() + 1);
            if let Some(instance) = self.builder.build(id, group, &visuals) {
                instances.push(instance);
            }
        }

        let noise_dropped = outcome.groups.len() - instances.len();
        info!(
            groups = outcome.groups.len(),
            instances = instances.len(),
            noise_dropped,
            skipped = outcome.skipped,
            fuzzy = outcome.fuzzy_applied,
            "consolidated text detections"
        );

        Consolidation {
            instances,
            group_count: outcome.groups.len(),
            noise_dropped,
            skipped_detections: outcome.skipped,
            fuzzy_applied: outcome.fuzzy_applied,
        }
    }
}

fn instance_id(ordinal: usize) -> String {
    format!("text-{ordinal:03}")
}
