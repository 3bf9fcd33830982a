//! Design-system resolution
//!
//! The design collaborator may return any subset of tokens. Each missing,
//! blank or invalid field falls back to a fixed constant and produces one
//! warning, so the rendered template is always complete and the degradation
//! is visible in [`PipelineResult::warnings`](crate::types::PipelineResult).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::DesignSystem;

pub const FALLBACK_FONT: &str = "Inter";
pub const FALLBACK_PRIMARY: &str = "#FFFFFF";
pub const FALLBACK_BACKGROUND: &str = "#000000";
pub const FALLBACK_TEXT: &str = "#FFFFFF";
pub const FALLBACK_ACCENT: &str = "#FFD600";
pub const FALLBACK_SPACING_BASE: u32 = 4;
pub const FALLBACK_BORDER_RADIUS: u32 = 8;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid hex pattern")
});

/// Design tokens as returned by the collaborator, every field optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialDesignSystem {
    #[serde(alias = "font", alias = "bodyFont")]
    pub font_family: Option<String>,
    pub heading_font: Option<String>,
    #[serde(alias = "primary")]
    pub primary_color: Option<String>,
    #[serde(alias = "background")]
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    #[serde(alias = "accent")]
    pub accent_color: Option<String>,
    #[serde(alias = "spacing")]
    pub spacing_base: Option<u32>,
    pub border_radius: Option<u32>,
}

/// Fill every token, returning one warning per fallback used.
#[must_use]
pub fn resolve(partial: Option<&PartialDesignSystem>) -> (DesignSystem, Vec<String>) {
    let empty = PartialDesignSystem::default();
    let p = partial.unwrap_or(&empty);
    let mut warnings = Vec::new();

    let design = DesignSystem {
        font_family: font(p.font_family.as_deref(), "fontFamily", &mut warnings),
        heading_font: font(p.heading_font.as_deref(), "headingFont", &mut warnings),
        primary_color: color(p.primary_color.as_deref(), "primaryColor", FALLBACK_PRIMARY, &mut warnings),
        background_color: color(
            p.background_color.as_deref(),
            "backgroundColor",
            FALLBACK_BACKGROUND,
            &mut warnings,
        ),
        text_color: color(p.text_color.as_deref(), "textColor", FALLBACK_TEXT, &mut warnings),
        accent_color: color(p.accent_color.as_deref(), "accentColor", FALLBACK_ACCENT, &mut warnings),
        spacing_base: number(p.spacing_base, "spacingBase", FALLBACK_SPACING_BASE, &mut warnings),
        border_radius: number(p.border_radius, "borderRadius", FALLBACK_BORDER_RADIUS, &mut warnings),
    };

    (design, warnings)
}

fn font(value: Option<&str>, field: &str, warnings: &mut Vec<String>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => {
            warnings.push(format!(
                "design system: {field} missing, using fallback \"{FALLBACK_FONT}\""
            ));
            FALLBACK_FONT.to_string()
        }
    }
}

fn color(value: Option<&str>, field: &str, fallback: &str, warnings: &mut Vec<String>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if HEX_COLOR.is_match(v) => v.to_uppercase(),
        Some(v) => {
            warnings.push(format!(
                "design system: {field} \"{v}\" is not a hex color, using fallback \"{fallback}\""
            ));
            fallback.to_string()
        }
        None => {
            warnings.push(format!(
                "design system: {field} missing, using fallback \"{fallback}\""
            ));
            fallback.to_string()
        }
    }
}

fn number(value: Option<u32>, field: &str, fallback: u32, warnings: &mut Vec<String>) -> u32 {
    value.unwrap_or_else(|| {
        warnings.push(format!(
            "design system: {field} missing, using fallback {fallback}"
        ));
        fallback
    })
}
