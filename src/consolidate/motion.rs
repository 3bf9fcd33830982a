//! Motion-path synthesis and classification
//!
//! Every group yields keyframes at its detections' positions, timed relative
//! to the segment start. Classification is coarse on purpose: summed x/y
//! variance separates still text from moving text, and an optional velocity
//! profile (first half of the path against the second half) picks an easing.
//!
//! `POP_IN` is assigned when a path of three or more keyframes spends most of
//! its length on the very first step and then holds still: text that jumps
//! into place and stays there.
//!
//! The velocity profile compares the slower half's mean speed against the
//! faster one. Below `easing_ratio` it is `EASE_IN` or `EASE_OUT`; a relative
//! gap under `linear_tolerance` is `LINEAR`. `EASE_IN_OUT` covers the gaps in
//! between, `linear_tolerance..=1 - easing_ratio`. The defaults (0.7 and 0.3)
//! leave that band a single point, so in practice it only appears with a lower
//! `easing_ratio` or a lower `linear_tolerance`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MotionConfig;
use crate::types::{
    ConsolidatedTextInstance, MotionKeyframe, MotionPath, MotionType, RawTextDetection,
};

/// Builds and classifies motion paths
pub struct MotionSynthesizer {
    config: MotionConfig,
}

impl MotionSynthesizer {
    #[must_use]
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    /// Build the motion path for a group of detections.
    ///
    /// `segment_start` is the owning instance's start time in seconds;
    /// keyframe times are relative to it. `fps` must be positive.
    #[must_use]
    pub fn synthesize(
        &self,
        members: &[RawTextDetection],
        fps: f64,
        segment_start: f64,
    ) -> MotionPath {
        let mut keyframes: Vec<MotionKeyframe> = members
            .iter()
            .filter_map(|d| {
                d.bounding_box.map(|b| MotionKeyframe {
                    time: f64::from(d.frame_index) / fps - segment_start,
                    x: b.x,
                    y: b.y,
                })
            })
            .collect();
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        let (motion_type, variance) = self.classify(&keyframes);
        debug!(
            keyframes = keyframes.len(),
            variance,
            motion = motion_type.as_str(),
            "classified motion"
        );

        MotionPath {
            keyframes,
            motion_type,
            variance,
        }
    }

    /// Classify time-sorted keyframes, returning the type and total variance.
    #[must_use]
    pub fn classify(&self, keyframes: &[MotionKeyframe]) -> (MotionType, f64) {
        let xs: Vec<f64> = keyframes.iter().map(|k| k.x).collect();
        let ys: Vec<f64> = keyframes.iter().map(|k| k.y).collect();
        let variance = population_variance(&xs) + population_variance(&ys);

        if variance <= self.config.static_variance {
            return (MotionType::Static, variance);
        }

        if self.config.velocity_profile && path_extent(keyframes) < self.config.min_displacement {
            // OCR jitter: noisy, but never actually travels anywhere
            return (MotionType::Static, variance);
        }

        if self.is_pop_in(keyframes) {
            return (MotionType::PopIn, variance);
        }

        let motion_type = if self.config.velocity_profile {
            self.velocity_profile(keyframes)
        } else {
            MotionType::Linear
        };

        (motion_type, variance)
    }

    fn is_pop_in(&self, keyframes: &[MotionKeyframe]) -> bool {
        if keyframes.len() < 3 {
            return false;
        }
        let length = path_length(keyframes);
        if length <= 0.0 {
            return false;
        }
        let first_step = distance(&keyframes[0], &keyframes[1]);
        if first_step < self.config.pop_in_jump_ratio * length {
            return false;
        }

        let tail = &keyframes[1..];
        let xs: Vec<f64> = tail.iter().map(|k| k.x).collect();
        let ys: Vec<f64> = tail.iter().map(|k| k.y).collect();
        population_variance(&xs) + population_variance(&ys) <= self.config.static_variance
    }

    /// Compare mean speed over the first and second halves of the path.
    fn velocity_profile(&self, keyframes: &[MotionKeyframe]) -> MotionType {
        if keyframes.len() < 3 {
            return MotionType::Linear;
        }

        let velocities: Vec<f64> = keyframes
            .windows(2)
            .filter_map(|pair| {
                let dt = pair[1].time - pair[0].time;
                (dt > 0.0).then(|| distance(&pair[0], &pair[1]) / dt)
            })
            .collect();
        if velocities.len() < 2 {
            return MotionType::Linear;
        }

        let mid = velocities.len() / 2;
        let first = mean(&velocities[..mid]);
        let second = mean(&velocities[mid..]);
        let fastest = first.max(second);
        if fastest <= 0.0 {
            return MotionType::Linear;
        }

        let ratio = self.config.easing_ratio;
        if first < ratio * second {
            MotionType::EaseIn
        } else if second < ratio * first {
            MotionType::EaseOut
        } else if (first - second).abs() / fastest < self.config.linear_tolerance {
            MotionType::Linear
        } else {
            MotionType::EaseInOut
        }
    }
}

impl Default for MotionSynthesizer {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

/// Population variance; zero for an empty slice.
#[must_use]
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn distance(a: &MotionKeyframe, b: &MotionKeyframe) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn path_length(keyframes: &[MotionKeyframe]) -> f64 {
    keyframes.windows(2).map(|p| distance(&p[0], &p[1])).sum()
}

/// Diagonal of the box spanned by all keyframe positions.
fn path_extent(keyframes: &[MotionKeyframe]) -> f64 {
    let (min_x, max_x, min_y, max_y) = keyframes.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), k| {
            (min_x.min(k.x), max_x.max(k.x), min_y.min(k.y), max_y.max(k.y))
        },
    );
    if keyframes.is_empty() {
        return 0.0;
    }
    (max_x - min_x).hypot(max_y - min_y)
}

/// Easing names understood by the editor front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiEasing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl UiEasing {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "ease-in",
            Self::EaseOut => "ease-out",
            Self::EaseInOut => "ease-in-out",
        }
    }
}

impl From<MotionType> for UiEasing {
    fn from(motion: MotionType) -> Self {
        match motion {
            MotionType::Static | MotionType::Linear => Self::Linear,
            MotionType::EaseIn => Self::EaseIn,
            MotionType::EaseOut | MotionType::PopIn => Self::EaseOut,
            MotionType::EaseInOut => Self::EaseInOut,
        }
    }
}

/// Editor-facing motion representation: keyframes, easing and total duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMotionPath {
    pub keyframes: Vec<MotionKeyframe>,
    pub easing: UiEasing,
    /// Seconds
    pub duration: f64,
}

impl UiMotionPath {
    #[must_use]
    pub fn from_path(path: &MotionPath, duration: f64) -> Self {
        Self {
            keyframes: path.keyframes.clone(),
            easing: path.motion_type.into(),
            duration,
        }
    }

    /// UI motion for an instance, if it carries a motion path.
    #[must_use]
    pub fn for_instance(instance: &ConsolidatedTextInstance) -> Option<Self> {
        instance
            .motion_path
            .as_ref()
            .map(|path| Self::from_path(path, instance.duration))
    }
}
