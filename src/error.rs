//! Engine error taxonomy
//!
//! Data-quality problems (noise, partial enrichment, malformed detections)
//! never surface here; they are absorbed and reported through
//! [`PipelineResult::warnings`](crate::types::PipelineResult). Only invalid
//! configuration, boundary payloads that fail validation, and a failed vision
//! stage are errors.

use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vision analysis error: {0}")]
    Vision(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
