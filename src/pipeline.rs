//! End-to-end template pipeline
//!
//! Sequences vision analysis, consolidation and enrichment into one
//! [`PipelineResult`]. Only configuration problems and a failed vision stage
//! are errors; every other degradation is reported through
//! [`PipelineResult::warnings`].

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{Collaborators, VisionCollaborator};
use crate::config::EngineConfig;
use crate::consolidate::{Consolidation, Consolidator};
use crate::enrich::EnrichmentMerger;
use crate::error::{EngineError, Result};
use crate::types::{FrameInput, PipelineResult, RawFrameAnalysis};

/// Turns sampled video frames into an editable overlay template
pub struct TemplatePipeline {
    vision: Arc<dyn VisionCollaborator>,
    consolidator: Consolidator,
    merger: EnrichmentMerger,
}

impl TemplatePipeline {
    /// Create a pipeline, validating `config` first.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            vision: collaborators.vision,
            consolidator: Consolidator::new(&config),
            merger: EnrichmentMerger::new(
                collaborators.layout,
                collaborators.role,
                collaborators.design,
                collaborators.variation,
                config.enrichment,
            ),
        })
    }

    /// Run the whole pipeline on an ordered batch of frames.
    ///
    /// Fails only when the vision collaborator fails. The result's
    /// `project_id` is fresh on every call; everything else is a pure
    /// function of the frames and collaborator outputs.
    #[tracing::instrument(skip_all, fields(frames = frames.len()))]
    pub async fn process_video(&self, frames: &[FrameInput]) -> Result<PipelineResult> {
        let analyses = self
            .vision
            .analyze_frames(frames)
            .await
            .map_err(|e| EngineError::Vision(format!("{e:#}")))?;
        info!(analyses = analyses.len(), "vision analysis complete");

        let mut warnings = Vec::new();
        if analyses.len() != frames.len() {
            let message = format!(
                "vision returned {} analyses for {} frames",
                analyses.len(),
                frames.len()
            );
            warn!("{message}");
            warnings.push(message);
        }

        Ok(self.finish(analyses, warnings).await)
    }

    /// Run consolidation and enrichment on analyses that were produced
    /// elsewhere, e.g. replayed from a saved vision reply.
    pub async fn process_analyses(&self, analyses: Vec<RawFrameAnalysis>) -> PipelineResult {
        self.finish(analyses, Vec::new()).await
    }

    /// Consolidation only. `analyses` need not be sorted.
    #[must_use]
    pub fn consolidate(&self, analyses: &[RawFrameAnalysis]) -> Consolidation {
        let mut sorted = analyses.to_vec();
        sorted.sort_by_key(|a| a.frame_index);
        self.consolidator.consolidate(&sorted)
    }

    async fn finish(
        &self,
        mut analyses: Vec<RawFrameAnalysis>,
        mut warnings: Vec<String>,
    ) -> PipelineResult {
        analyses.sort_by_key(|a| a.frame_index);
        let consolidation = self.consolidator.consolidate(&analyses);

        if consolidation.skipped_detections > 0 {
            let message = format!(
                "skipped {} malformed detection(s) with a missing or invalid bounding box, \
                 confidence or text",
                consolidation.skipped_detections
            );
            warn!("{message}");
            warnings.push(message);
        }

        let enrichment = self.merger.merge(consolidation.instances).await;
        warnings.extend(enrichment.warnings);

        let result = PipelineResult {
            project_id: Uuid::new_v4().to_string(),
            overlays: enrichment.overlays,
            design_system: enrichment.design_system,
            variations: enrichment.variations,
            warnings,
        };
        info!(
            project_id = %result.project_id,
            overlays = result.overlays.len(),
            warnings = result.warnings.len(),
            "template pipeline complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        DesignSystemCollaborator, LayoutCollaborator, RoleCollaborator, VariationCollaborator,
    };
    use crate::enrich::design::PartialDesignSystem;
    use crate::types::{
        BoundingBox, ConsolidatedTextInstance, EnrichedOverlay, LayoutLogic, RawTextDetection,
        Role, TextVisuals,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct Canned(Vec<RawFrameAnalysis>);

    #[async_trait]
    impl VisionCollaborator for Canned {
        async fn analyze_frames(&self, _: &[FrameInput]) -> anyhow::Result<Vec<RawFrameAnalysis>> {
            Ok(self.0.clone())
        }
    }

    struct Blind;

    #[async_trait]
    impl VisionCollaborator for Blind {
        async fn analyze_frames(&self, _: &[FrameInput]) -> anyhow::Result<Vec<RawFrameAnalysis>> {
            Err(anyhow!("vision model unavailable"))
        }
    }

    struct Quiet;

    #[async_trait]
    impl LayoutCollaborator for Quiet {
        async fn analyze_layout(
            &self,
            _: &[ConsolidatedTextInstance],
        ) -> anyhow::Result<HashMap<String, LayoutLogic>> {
            Ok(HashMap::new())
        }
    }

    #[async_trait]
    impl RoleCollaborator for Quiet {
        async fn classify_roles(
            &self,
            _: &[ConsolidatedTextInstance],
        ) -> anyhow::Result<HashMap<String, Role>> {
            Ok(HashMap::new())
        }
    }

    #[async_trait]
    impl DesignSystemCollaborator for Quiet {
        async fn generate_design_system(
            &self,
            _: &[ConsolidatedTextInstance],
        ) -> anyhow::Result<PartialDesignSystem> {
            Ok(PartialDesignSystem::default())
        }
    }

    #[async_trait]
    impl VariationCollaborator for Quiet {
        async fn generate_variations(
            &self,
            _: &[EnrichedOverlay],
        ) -> anyhow::Result<HashMap<String, Vec<String>>> {
            Ok(HashMap::new())
        }
    }

    fn collaborators(vision: Arc<dyn VisionCollaborator>) -> Collaborators {
        Collaborators {
            vision,
            layout: Arc::new(Quiet),
            role: Arc::new(Quiet),
            design: Arc::new(Quiet),
            variation: Arc::new(Quiet),
        }
    }

    fn frames(count: u32) -> Vec<FrameInput> {
        (0..count)
            .map(|index| FrameInput {
                index,
                timestamp_ms: u64::from(index) * 1000,
                path: PathBuf::from(format!("frame_{index:04}.jpg")),
            })
            .collect()
    }

    fn analysis(frame: u32, text: &str) -> RawFrameAnalysis {
        RawFrameAnalysis {
            frame_index: frame,
            timestamp: u64::from(frame) * 1000,
            detections: vec![RawTextDetection {
                text: text.to_string(),
                frame_index: frame,
                bounding_box: Some(BoundingBox::new(5.0, 5.0, 40.0, 10.0)),
                confidence: 0.9,
                language: None,
            }],
            visuals: TextVisuals::default(),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig::default().with_fps(0.0);
        let err = TemplatePipeline::new(config, collaborators(Arc::new(Blind)))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn vision_failure_is_fatal() {
        let pipeline =
            TemplatePipeline::new(EngineConfig::default(), collaborators(Arc::new(Blind))).unwrap();

        let err = pipeline.process_video(&frames(2)).await.unwrap_err();

        assert!(matches!(err, EngineError::Vision(ref m) if m.contains("unavailable")));
    }

    #[tokio::test]
    async fn unsorted_analyses_are_reordered() {
        let vision = Canned(vec![analysis(2, "LATE"), analysis(0, "LATE"), analysis(1, "LATE")]);
        let pipeline =
            TemplatePipeline::new(EngineConfig::default(), collaborators(Arc::new(vision))).unwrap();

        let result = pipeline.process_video(&frames(3)).await.unwrap();

        let instance = &result.overlays[0].instance;
        assert_eq!((instance.start_frame, instance.end_frame), (0, 2));
        assert!(!result.warnings.iter().any(|w| w.starts_with("vision returned")));
    }

    #[tokio::test]
    async fn count_mismatch_is_a_warning() {
        let vision = Canned(vec![analysis(0, "HELLO"), analysis(1, "HELLO")]);
        let pipeline =
            TemplatePipeline::new(EngineConfig::default(), collaborators(Arc::new(vision))).unwrap();

        let result = pipeline.process_video(&frames(4)).await.unwrap();

        assert_eq!(result.overlays.len(), 1);
        assert!(result
            .warnings
            .contains(&"vision returned 2 analyses for 4 frames".to_string()));
    }

    #[test]
    fn project_ids_are_unique() {
        let pipeline =
            TemplatePipeline::new(EngineConfig::default(), collaborators(Arc::new(Canned(vec![]))))
                .unwrap();

        let a = tokio_test::block_on(pipeline.process_analyses(Vec::new()));
        let b = tokio_test::block_on(pipeline.process_analyses(Vec::new()));

        assert_ne!(a.project_id, b.project_id);
        assert!(Uuid::parse_str(&a.project_id).is_ok());
    }
}
