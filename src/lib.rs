//! `kinetext` - Temporal text consolidation and motion inference
//!
//! Turns per-frame OCR output from short-form video into an editable overlay
//! template.
//!
//! # Features
//!
//! - **Consolidation**: groups detections of the same text across frames,
//!   drops uncorroborated noise, aggregates boxes and picks a canonical label
//! - **Motion inference**: keyframe paths classified as static, linear,
//!   eased or pop-in
//! - **Enrichment**: layout, role, design-system and copy-variation
//!   collaborators run concurrently, each with its own timeout and defaults
//! - **Reporting**: JSON, Markdown and SRT renderings of the result
//!
//! # Example
//!
//! ```rust,no_run
//! use kinetext::{payload, Consolidator, EngineConfig};
//!
//! fn main() -> kinetext::Result<()> {
//!     let reply = std::fs::read_to_string("vision_reply.json")?;
//!     let analyses = payload::parse_frame_analyses(&reply)?;
//!
//!     let config = EngineConfig::load_default()?;
//!     let consolidation = Consolidator::new(&config).consolidate(&analyses);
//!     for instance in &consolidation.instances {
//!         println!("{} {:.1}s-{:.1}s {}", instance.id, instance.start_time, instance.end_time, instance.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod collaborators;
pub mod config;
pub mod consolidate;
pub mod enrich;
pub mod error;
pub mod payload;
pub mod pipeline;
pub mod report;
pub mod types;

pub use collaborators::{
    Collaborators, DesignSystemCollaborator, LayoutCollaborator, RoleCollaborator,
    VariationCollaborator, VisionCollaborator,
};
pub use config::{EngineConfig, EnrichmentConfig, GroupingConfig, GroupingStrategy, MotionConfig};
pub use consolidate::{Consolidation, Consolidator, UiEasing, UiMotionPath};
pub use enrich::design::PartialDesignSystem;
pub use enrich::{Enrichment, EnrichmentMerger};
pub use error::{EngineError, Result};
pub use pipeline::TemplatePipeline;
pub use report::{PipelineReport, ReportFormat};
pub use types::{
    Alignment, Anchor, BoundingBox, ConsolidatedTextInstance, DesignSystem, EnrichedOverlay,
    FrameInput, LayoutLogic, MotionKeyframe, MotionPath, MotionType, PipelineResult,
    RawFrameAnalysis, RawTextDetection, Role, TextVisuals,
};

/// Version of kinetext
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
