//! Template report generation
//!
//! Renders a [`PipelineResult`] for people: a Markdown review sheet, an SRT
//! file for scrubbing overlays against the source video, or pretty JSON.

use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::consolidate::UiMotionPath;
use crate::error::Result;
use crate::types::{PipelineResult, Role};

/// Report output format
#[derive(Debug, Clone, Copy, Default)]
pub enum ReportFormat {
    /// JSON (default, machine-readable)
    #[default]
    Json,
    /// Markdown (human-readable)
    Markdown,
    /// SRT subtitles, one cue per overlay
    Srt,
}

/// Template report generator
pub struct PipelineReport;

impl PipelineReport {
    /// Generate report in specified format
    pub fn generate(result: &PipelineResult, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => Self::to_json(result),
            ReportFormat::Markdown => Self::to_markdown(result),
            ReportFormat::Srt => Self::to_srt(result),
        }
    }

    /// Save report to file
    pub fn save(result: &PipelineResult, format: ReportFormat, path: &Path) -> Result<()> {
        let content = Self::generate(result, format)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn to_json(result: &PipelineResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn to_markdown(result: &PipelineResult) -> Result<String> {
        let mut md = String::new();

        writeln!(md, "# Template Report\n")?;
        writeln!(md, "- **Project**: `{}`", result.project_id)?;
        writeln!(md, "- **Overlays**: {}", result.overlays.len())?;

        let count = |role: Role| result.overlays.iter().filter(|o| o.role == role).count();
        writeln!(
            md,
            "- **Roles**: {} hook, {} body, {} cta",
            count(Role::Hook),
            count(Role::Body),
            count(Role::Cta)
        )?;

        let ds = &result.design_system;
        writeln!(md, "\n## Design System\n")?;
        writeln!(md, "- **Fonts**: {} / {}", ds.font_family, ds.heading_font)?;
        writeln!(
            md,
            "- **Colors**: primary {}, background {}, text {}, accent {}",
            ds.primary_color, ds.background_color, ds.text_color, ds.accent_color
        )?;
        writeln!(
            md,
            "- **Spacing**: base {}px, radius {}px",
            ds.spacing_base, ds.border_radius
        )?;

        if !result.overlays.is_empty() {
            writeln!(md, "\n## Overlays\n")?;
            writeln!(md, "| Id | Text | Role | Time | Anchor | Motion | Easing |")?;
            writeln!(md, "|----|------|------|------|--------|--------|--------|")?;

            for overlay in &result.overlays {
                let instance = &overlay.instance;
                let motion = instance
                    .motion_path
                    .as_ref()
                    .map_or("-", |p| p.motion_type.as_str());
                let easing = UiMotionPath::for_instance(instance)
                    .map_or("-", |ui| ui.easing.as_str());
                writeln!(
                    md,
                    "| {} | {} | {} | {:.1}s-{:.1}s | {} | {motion} | {easing} |",
                    instance.id,
                    instance.text.replace('|', "\\|"),
                    overlay.role.as_str(),
                    instance.start_time,
                    instance.end_time,
                    overlay.layout.anchor.as_str(),
                )?;
            }
        }

        if !result.variations.is_empty() {
            writeln!(md, "\n## Variations\n")?;
            for (id, texts) in &result.variations {
                writeln!(md, "- **{id}**")?;
                for text in texts {
                    writeln!(md, "  - {text}")?;
                }
            }
        }

        if !result.warnings.is_empty() {
            writeln!(md, "\n## Warnings\n")?;
            for warning in &result.warnings {
                writeln!(md, "- {warning}")?;
            }
        }

        Ok(md)
    }

    fn to_srt(result: &PipelineResult) -> Result<String> {
        let mut srt = String::new();

        for (i, overlay) in result.overlays.iter().enumerate() {
            let instance = &overlay.instance;
            let start = Self::format_srt_time(instance.start_time);
            let end = Self::format_srt_time(instance.start_time + instance.duration);

            writeln!(srt, "{}", i + 1)?;
            writeln!(srt, "{start} --> {end}")?;
            writeln!(srt, "[{}] {}", overlay.role.as_str(), instance.text)?;
            writeln!(srt)?;
        }

        Ok(srt)
    }

    /// Format time for SRT (HH:MM:SS,mmm)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn format_srt_time(seconds: f64) -> String {
        let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let secs = (total_millis % 60_000) / 1000;
        let millis = total_millis % 1000;

        format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Anchor, BoundingBox, ConsolidatedTextInstance, DesignSystem, EnrichedOverlay, LayoutLogic,
        MotionKeyframe, MotionPath, MotionType, TextVisuals,
    };
    use std::collections::BTreeMap;

    fn overlay(id: &str, text: &str, role: Role, start: f64, end: f64) -> EnrichedOverlay {
        EnrichedOverlay {
            instance: ConsolidatedTextInstance {
                id: id.to_string(),
                text: text.to_string(),
                start_frame: 0,
                end_frame: 0,
                start_time: start,
                end_time: end,
                duration: (end - start).max(1.0),
                bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                motion_path: Some(MotionPath {
                    keyframes: vec![
                        MotionKeyframe { time: 0.0, x: 0.0, y: 0.0 },
                        MotionKeyframe { time: 1.0, x: 40.0, y: 0.0 },
                    ],
                    motion_type: MotionType::PopIn,
                    variance: 400.0,
                }),
                visuals: TextVisuals::default(),
                detection_confidence: 0.9,
                detection_count: 2,
            },
            role,
            layout: LayoutLogic {
                anchor: Anchor::BottomCenter,
                ..LayoutLogic::default()
            },
        }
    }

    fn sample_result() -> PipelineResult {
        PipelineResult {
            project_id: "3f0e5c1a-0000-4000-8000-000000000000".to_string(),
            overlays: vec![
                overlay("text-001", "WAIT FOR IT", Role::Hook, 0.0, 2.0),
                overlay("text-002", "A | B", Role::Body, 2.0, 2.0),
                overlay("text-003", "FOLLOW", Role::Cta, 61.5, 63.0),
            ],
            design_system: DesignSystem {
                font_family: "Inter".to_string(),
                heading_font: "Inter".to_string(),
                primary_color: "#FFFFFF".to_string(),
                background_color: "#000000".to_string(),
                text_color: "#FFFFFF".to_string(),
                accent_color: "#FFD600".to_string(),
                spacing_base: 4,
                border_radius: 8,
            },
            variations: BTreeMap::from([(
                "text-001".to_string(),
                vec!["Hold on".to_string()],
            )]),
            warnings: vec!["role enrichment timed out after 50ms".to_string()],
        }
    }

    #[test]
    fn json_generation() {
        let json = PipelineReport::generate(&sample_result(), ReportFormat::Json).unwrap();
        assert!(json.contains("\"projectId\""));
        assert!(json.contains("\"POP_IN\""));
        assert!(json.contains("\"bottom-center\""));
    }

    #[test]
    fn markdown_generation() {
        let md = PipelineReport::generate(&sample_result(), ReportFormat::Markdown).unwrap();

        assert!(md.contains("# Template Report"));
        assert!(md.contains("1 hook, 1 body, 1 cta"));
        assert!(md.contains("| text-001 | WAIT FOR IT | HOOK | 0.0s-2.0s | bottom-center | POP_IN | ease-out |"));
        assert!(md.contains("A \\| B"));
        assert!(md.contains("  - Hold on"));
        assert!(md.contains("- role enrichment timed out after 50ms"));
    }

    #[test]
    fn srt_uses_floored_duration() {
        let srt = PipelineReport::generate(&sample_result(), ReportFormat::Srt).unwrap();

        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,000\n[HOOK] WAIT FOR IT"));
        // zero-length display still gets the one-second floor
        assert!(srt.contains("00:00:02,000 --> 00:00:03,000"));
        assert!(srt.contains("00:01:01,500 --> 00:01:03,000"));
    }

    #[test]
    fn time_formatting() {
        assert_eq!(PipelineReport::format_srt_time(0.0), "00:00:00,000");
        assert_eq!(PipelineReport::format_srt_time(61.5), "00:01:01,500");
        assert_eq!(PipelineReport::format_srt_time(3661.123), "01:01:01,123");
    }

    #[test]
    fn save_writes_file() {
        let path = std::env::temp_dir().join(format!("kinetext_report_{}.srt", std::process::id()));
        PipelineReport::save(&sample_result(), ReportFormat::Srt, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.starts_with("1\n"));
    }
}
