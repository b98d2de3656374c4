//! Utility functions for dates, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Spanish date formatting for the lesson header
//! - String truncation and whitespace cleanup for logging and feeds
//! - JSON helpers for handling LLM responses (fences, truncation)
//! - File system validation for the output directory

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("valid regex"));

// An opening fence with nothing closing it: the answer was cut off.
static OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*)").expect("valid regex"));

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Format a date the way the lesson header prints it.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(spanish_date(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()), "15 de octubre de 2026");
/// ```
pub fn spanish_date(date: NaiveDate) -> String {
    let month = MONTHS_ES[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary before `max` bytes,
/// with an ellipsis and byte count appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Return the JSON payload of a model answer, without Markdown code fences.
///
/// Models frequently wrap JSON in ```` ```json ```` blocks even when told not to.
/// A block that is never closed yields everything after the opening fence, so
/// a truncated answer still parses up to an EOF error.
pub fn strip_code_fences(s: &str) -> &str {
    CODE_FENCE
        .captures(s)
        .or_else(|| OPEN_FENCE.captures(s))
        .and_then(|c| c.get(1))
        .map_or_else(|| s.trim(), |inner| inner.as_str().trim())
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off (e.g., due to token limits), the
/// resulting JSON will fail to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(spanish_date(date), "15 de octubre de 2026");
        let date = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        assert_eq!(spanish_date(date), "3 de enero de 2025");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hola, mundo", 100), "Hola, mundo");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "ñ" is two bytes; cutting at 2 would split the first one.
        let result = truncate_for_log("añño", 2);
        assert!(result.starts_with("a…"));
        assert!(result.contains("(+5 bytes)"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("Here you go:\n```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_unclosed_fence_is_stripped() {
        let cut = "```json\n{\"vocabulary\": [";
        assert_eq!(strip_code_fences(cut), "{\"vocabulary\": [");
        let err = serde_json::from_str::<serde_json::Value>(strip_code_fences(cut)).unwrap_err();
        assert!(looks_truncated(&err));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let err = serde_json::from_str::<serde_json::Value>(json_eof).unwrap_err();
        assert!(looks_truncated(&err));

        let json_bad = r#"{"field": value}"#;
        let err = serde_json::from_str::<serde_json::Value>(json_bad).unwrap_err();
        assert!(!looks_truncated(&err));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("pdfs").join("nested");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
