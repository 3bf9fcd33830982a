//! Enrichment fan-out and merge
//!
//! Layout, role and design-system collaborators run concurrently and are
//! joined; variation generation runs after the join because it only applies
//! to overlays classified as `HOOK` or `CTA`. Every branch has its own
//! timeout, and a branch that errors or times out degrades to its defaults
//! without cancelling the others:
//!
//! | Missing        | Default                                                 |
//! |----------------|---------------------------------------------------------|
//! | layout         | center anchor, center alignment, z-index 1, no padding  |
//! | role           | `BODY`                                                  |
//! | design tokens  | per-field fallbacks from [`design`], one warning each   |
//! | variations     | none                                                    |

pub mod design;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::collaborators::{
    DesignSystemCollaborator, LayoutCollaborator, RoleCollaborator, VariationCollaborator,
};
use crate::config::EnrichmentConfig;
use crate::types::{ConsolidatedTextInstance, DesignSystem, EnrichedOverlay, LayoutLogic, Role};

/// Merged enrichment for one batch of instances
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub overlays: Vec<EnrichedOverlay>,
    pub design_system: DesignSystem,
    pub variations: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
}

/// Fans instances out to enrichment collaborators and merges the results by id
pub struct EnrichmentMerger {
    layout: Arc<dyn LayoutCollaborator>,
    role: Arc<dyn RoleCollaborator>,
    design: Arc<dyn DesignSystemCollaborator>,
    variation: Arc<dyn VariationCollaborator>,
    config: EnrichmentConfig,
}

impl EnrichmentMerger {
    #[must_use]
    pub fn new(
        layout: Arc<dyn LayoutCollaborator>,
        role: Arc<dyn RoleCollaborator>,
        design: Arc<dyn DesignSystemCollaborator>,
        variation: Arc<dyn VariationCollaborator>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            layout,
            role,
            design,
            variation,
            config,
        }
    }

    /// Enrich `instances`. Never fails; degraded branches are reported in
    /// [`Enrichment::warnings`].
    pub async fn merge(&self, instances: Vec<ConsolidatedTextInstance>) -> Enrichment {
        let mut warnings = Vec::new();

        if instances.is_empty() {
            info!("no consolidated instances, skipping enrichment collaborators");
            let (design_system, design_warnings) = design::resolve(None);
            warnings.extend(design_warnings);
            return Enrichment {
                overlays: Vec::new(),
                design_system,
                variations: BTreeMap::new(),
                warnings,
            };
        }

        let timeout = self.config.timeout();
        let (layouts, roles, partial_design) = tokio::join!(
            guarded("layout", timeout, self.layout.analyze_layout(&instances)),
            guarded("role", timeout, self.role.classify_roles(&instances)),
            guarded("design system", timeout, self.design.generate_design_system(&instances)),
        );

        let layouts = settle(layouts, &mut warnings).unwrap_or_default();
        let roles = settle(roles, &mut warnings).unwrap_or_default();
        let partial_design = settle(partial_design, &mut warnings);

        let (design_system, design_warnings) = design::resolve(partial_design.as_ref());
        warnings.extend(design_warnings);

        let overlays = apply(instances, &layouts, &roles);
        let variations = self.variations(&overlays, &mut warnings).await;

        info!(
            overlays = overlays.len(),
            variations = variations.len(),
            warnings = warnings.len(),
            "enrichment merged"
        );

        Enrichment {
            overlays,
            design_system,
            variations,
            warnings,
        }
    }

    async fn variations(
        &self,
        overlays: &[EnrichedOverlay],
        warnings: &mut Vec<String>,
    ) -> BTreeMap<String, Vec<String>> {
        if !self.config.variations {
            return BTreeMap::new();
        }

        let targets: Vec<EnrichedOverlay> = overlays
            .iter()
            .filter(|o| o.role.wants_variations())
            .cloned()
            .collect();
        if targets.is_empty() {
            debug!("no HOOK or CTA overlays, skipping variations");
            return BTreeMap::new();
        }

        let outcome = guarded(
            "variation",
            self.config.timeout(),
            self.variation.generate_variations(&targets),
        )
        .await;
        let raw = settle(outcome, warnings).unwrap_or_default();

        let requested: HashSet<&str> = targets.iter().map(|o| o.instance.id.as_str()).collect();
        raw.into_iter()
            .filter(|(id, _)| requested.contains(id.as_str()))
            .filter_map(|(id, texts)| {
                let texts: Vec<String> = texts
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                (!texts.is_empty()).then_some((id, texts))
            })
            .collect()
    }
}

/// Attach role and layout to each instance by id, defaulting missing ids.
fn apply(
    instances: Vec<ConsolidatedTextInstance>,
    layouts: &HashMap<String, LayoutLogic>,
    roles: &HashMap<String, Role>,
) -> Vec<EnrichedOverlay> {
    instances
        .into_iter()
        .map(|instance| {
            let role = roles.get(&instance.id).copied().unwrap_or_default();
            let layout = layouts.get(&instance.id).copied().unwrap_or_default();
            EnrichedOverlay {
                instance,
                role,
                layout,
            }
        })
        .collect()
}

/// Run one branch under a timeout, mapping errors and expiry to a warning.
async fn guarded<T, F>(branch: &'static str, timeout: Duration, call: F) -> Result<T, String>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{branch} enrichment failed: {e:#}")),
        Err(_) => Err(format!(
            "{branch} enrichment timed out after {}ms",
            timeout.as_millis()
        )),
    }
}

fn settle<T>(outcome: Result<T, String>, warnings: &mut Vec<String>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(message) => {
            warn!("{message}; using defaults");
            warnings.push(message);
            None
        }
    }
}
