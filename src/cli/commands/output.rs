//! Shared text/JSON rendering for command results

use std::fmt::Write;

use serde::Serialize;

use crate::registry::ModelVersion;

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub(super) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .filter(|_| millis > 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(super) fn version_table(versions: &[ModelVersion]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<12} {:<22} {:<12} {:<40}", "VERSION", "STAGE", "STATUS", "FLAVOR", "SOURCE");
    let _ = writeln!(out, "{}", "-".repeat(98));
    for mv in versions {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<22} {:<12} {:<40}",
            mv.version,
            mv.current_stage,
            format!("{:?}", mv.status),
            truncate(mv.flavor().unwrap_or("-"), 12),
            truncate(&mv.source, 40),
        );
    }
    let _ = write!(out, "\n{} version(s)", versions.len());
    out
}

pub(super) fn version_detail(mv: &ModelVersion) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model: {} (version {})", mv.name, mv.version);
    let _ = writeln!(out, "  Stage:   {}", mv.current_stage);
    let _ = writeln!(out, "  Status:  {:?}", mv.status);
    let _ = writeln!(out, "  Flavor:  {}", mv.flavor().unwrap_or("-"));
    let _ = writeln!(out, "  Source:  {}", mv.source);
    if let Some(run_id) = &mv.run_id {
        let _ = writeln!(out, "  Run:     {run_id}");
    }
    if let Some(desc) = &mv.description {
        let _ = writeln!(out, "  Desc:    {desc}");
    }
    let _ = write!(out, "  Updated: {}", format_millis(mv.last_updated_timestamp));
    out
}
