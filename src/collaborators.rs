//! External collaborator traits.
//!
//! The engine owns no network or model code. Frame analysis and every
//! enrichment come from injected implementations of these traits, which makes
//! the pipeline deterministic under test with in-memory fakes.
//!
//! Enrichment collaborators return maps keyed by instance id. A missing id
//! means "nothing produced for this instance" and resolves to a documented
//! default in [`crate::enrich`]; an `Err` from any of them is never fatal.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::enrich::design::PartialDesignSystem;
use crate::types::{
    ConsolidatedTextInstance, EnrichedOverlay, FrameInput, LayoutLogic, RawFrameAnalysis, Role,
};

/// Per-frame OCR and style analysis.
#[async_trait]
pub trait VisionCollaborator: Send + Sync {
    /// One analysis per input frame, in frame order, including frames with
    /// no detections.
    async fn analyze_frames(&self, frames: &[FrameInput]) -> Result<Vec<RawFrameAnalysis>>;
}

/// Screen placement for consolidated instances.
#[async_trait]
pub trait LayoutCollaborator: Send + Sync {
    async fn analyze_layout(
        &self,
        instances: &[ConsolidatedTextInstance],
    ) -> Result<HashMap<String, LayoutLogic>>;
}

/// Narrative role (hook, body, call to action) per instance.
#[async_trait]
pub trait RoleCollaborator: Send + Sync {
    async fn classify_roles(
        &self,
        instances: &[ConsolidatedTextInstance],
    ) -> Result<HashMap<String, Role>>;
}

/// Design tokens for the whole template. Fields may be absent.
#[async_trait]
pub trait DesignSystemCollaborator: Send + Sync {
    async fn generate_design_system(
        &self,
        instances: &[ConsolidatedTextInstance],
    ) -> Result<PartialDesignSystem>;
}

/// Alternative copy for hook and call-to-action overlays.
#[async_trait]
pub trait VariationCollaborator: Send + Sync {
    /// Receives only overlays whose role is `HOOK` or `CTA`.
    async fn generate_variations(
        &self,
        overlays: &[EnrichedOverlay],
    ) -> Result<HashMap<String, Vec<String>>>;
}

/// The full set of collaborators a [`TemplatePipeline`](crate::pipeline::TemplatePipeline) needs.
#[derive(Clone)]
pub struct Collaborators {
    pub vision: Arc<dyn VisionCollaborator>,
    pub layout: Arc<dyn LayoutCollaborator>,
    pub role: Arc<dyn RoleCollaborator>,
    pub design: Arc<dyn DesignSystemCollaborator>,
    pub variation: Arc<dyn VariationCollaborator>,
}
