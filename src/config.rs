//! Engine configuration loaded from `~/.config/kinetext/engine.toml`.
//!
//! Every field has a default, so a partial file only overrides what it names:
//!
//! ```toml
//! fps = 2.0
//!
//! [grouping]
//! strategy = "adaptive"
//! singleton_ratio = 0.4
//!
//! [motion]
//! static_variance = 2.0
//! velocity_profile = true
//!
//! [enrichment]
//! timeout_ms = 20000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How raw detections are clustered into candidate text elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingStrategy {
    /// Normalized-key equality only
    Exact,
    /// Always run the similarity pass after exact grouping
    Fuzzy,
    /// Exact grouping, plus the similarity pass when too many groups are singletons
    #[default]
    Adaptive,
}

/// Temporal grouping settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub strategy: GroupingStrategy,
    /// Minimum edit-distance similarity (0.0-1.0) for a fuzzy merge
    pub fuzzy_threshold: f64,
    /// Singleton share of all groups that triggers the adaptive fuzzy pass
    pub singleton_ratio: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            strategy: GroupingStrategy::Adaptive,
            fuzzy_threshold: 0.8,
            singleton_ratio: 0.5,
        }
    }
}

/// Motion classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Total x+y variance (percent squared) at or below which a path is static
    pub static_variance: f64,
    /// Path extent (percent of frame) below which motion is treated as OCR jitter
    pub min_displacement: f64,
    /// Run the first-half/second-half velocity comparison
    pub velocity_profile: bool,
    /// A half slower than this fraction of the other half reads as easing
    pub easing_ratio: f64,
    /// Relative velocity difference under which motion reads as linear
    pub linear_tolerance: f64,
    /// Share of path length the first step must cover to count as a pop-in
    pub pop_in_jump_ratio: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            static_variance: 2.0,
            min_displacement: 5.0,
            velocity_profile: true,
            easing_ratio: 0.7,
            linear_tolerance: 0.3,
            pop_in_jump_ratio: 0.8,
        }
    }
}

/// Enrichment fan-out settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Per-branch timeout, milliseconds
    pub timeout_ms: u64,
    /// Request copy variations for HOOK/CTA overlays
    pub variations: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            variations: true,
        }
    }
}

impl EnrichmentConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sampling rate of the analysed frames (frames per second)
    pub fps: f64,
    /// Detections required before a group becomes an instance
    pub min_detections: usize,
    /// Floor for instance duration, seconds
    pub min_duration: f64,
    pub grouping: GroupingConfig,
    pub motion: MotionConfig,
    pub enrichment: EnrichmentConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 1.0,
            min_detections: 2,
            min_duration: 1.0,
            grouping: GroupingConfig::default(),
            motion: MotionConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `~/.config/kinetext/engine.toml`, or defaults if it doesn't exist.
    pub fn load_default() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Reject settings that would break engine invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if self.min_detections < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "min_detections must be at least 2, got {}",
                self.min_detections
            )));
        }
        if !self.min_duration.is_finite() || self.min_duration < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "min_duration must be >= 0, got {}",
                self.min_duration
            )));
        }
        check_unit("grouping.fuzzy_threshold", self.grouping.fuzzy_threshold)?;
        check_unit("grouping.singleton_ratio", self.grouping.singleton_ratio)?;
        check_unit("motion.easing_ratio", self.motion.easing_ratio)?;
        check_unit("motion.linear_tolerance", self.motion.linear_tolerance)?;
        check_unit("motion.pop_in_jump_ratio", self.motion.pop_in_jump_ratio)?;
        if self.motion.static_variance < 0.0 || self.motion.min_displacement < 0.0 {
            return Err(EngineError::InvalidConfig(
                "motion thresholds must be non-negative".to_string(),
            ));
        }
        if self.enrichment.timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "enrichment.timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the frame sampling rate
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Set the grouping strategy
    #[must_use]
    pub fn with_grouping(mut self, strategy: GroupingStrategy) -> Self {
        self.grouping.strategy = strategy;
        self
    }

    /// Enable or disable the velocity profile test
    #[must_use]
    pub fn with_velocity_profile(mut self, enabled: bool) -> Self {
        self.motion.velocity_profile = enabled;
        self
    }

    /// Set the per-branch enrichment timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.enrichment.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be within 0.0..=1.0, got {value}"
        )))
    }
}

/// Return the path to the engine config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kinetext")
        .join("engine.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.grouping.strategy, GroupingStrategy::Adaptive);
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
fps = 2.0

[grouping]
strategy = "exact"

[motion]
velocity_profile = false
"#;
        let config = EngineConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.fps, 2.0);
        assert_eq!(config.grouping.strategy, GroupingStrategy::Exact);
        assert_eq!(config.grouping.fuzzy_threshold, 0.8);
        assert!(!config.motion.velocity_profile);
        assert_eq!(config.motion.static_variance, 2.0);
        assert_eq!(config.enrichment.timeout_ms, 30_000);
    }

    #[test]
    fn rejects_zero_fps() {
        let err = EngineConfig::from_toml_str("fps = 0.0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_single_detection_instances() {
        let err = EngineConfig::from_toml_str("min_detections = 1").unwrap_err();
        assert!(err.to_string().contains("min_detections"));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let toml_str = "[grouping]\nfuzzy_threshold = 1.5\n";
        assert!(EngineConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = EngineConfig::from_toml_str("fps = = 2").unwrap_err();
        assert!(matches!(err, EngineError::Toml(_)));
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::default()
            .with_fps(30.0)
            .with_grouping(GroupingStrategy::Fuzzy)
            .with_velocity_profile(false)
            .with_timeout(Duration::from_micros(10));
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.grouping.strategy, GroupingStrategy::Fuzzy);
        assert!(!config.motion.velocity_profile);
        assert_eq!(config.enrichment.timeout_ms, 1);
        assert!(config.validate().is_ok());
    }
}
