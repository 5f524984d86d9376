//! Utility functions for time classification, string manipulation, and file system operations.
//!
//! Helpers shared across the newsroom commands:
//! - Edition naming from the local clock
//! - Slug generation for articles and categories
//! - String truncation for log output
//! - JSON error classification for LLM response truncation
//! - Output directory validation
//! - Word counting and read-time estimation

use chrono::{Local, NaiveTime};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Classify the current local time into morning, afternoon, or evening.
///
/// Published editions are named after the time of day they were assembled:
/// - **Morning**: 00:00 - 08:00
/// - **Afternoon**: 08:00 - 16:00
/// - **Evening**: 16:00 - 24:00
///
/// # Returns
///
/// A string: `"morning"`, `"afternoon"`, or `"evening"`.
#[instrument]
pub fn time_of_day() -> String {
    let morning_low = NaiveTime::from_hms_opt(0, 00, 0).unwrap();
    let morning_high = NaiveTime::from_hms_opt(8, 00, 0).unwrap();
    let afternoon_high = NaiveTime::from_hms_opt(16, 00, 0).unwrap();

    let tod = Local::now().time();
    let which = if (tod >= morning_low) && (tod < morning_high) {
        "morning"
    } else if (tod >= morning_high) && (tod < afternoon_high) {
        "afternoon"
    } else {
        "evening"
    };
    tracing::debug!(%tod, %which, "Computed time_of_day");
    which.to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When an LLM response is cut off at the token limit, the resulting JSON
/// fails to parse with an EOF error. Those failures are worth one re-ask;
/// other parse failures are not.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases the text, removes special characters, collapses whitespace
/// runs, and joins the words with hyphens. Used both for article/category
/// slugs in the store and for Markdown anchor links.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Markets  Rally!"), "markets-rally");
/// ```
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Capitalize the first character of a string.
///
/// Used for formatting edition names (e.g., "morning" -> "Morning").
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Count the words in a piece of content.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Estimate reading time in minutes at roughly 200 words per minute.
///
/// Never returns zero; even a one-line brief takes a minute to open.
pub fn reading_time_minutes(content: &str) -> u32 {
    ((word_count(content) as u32) / 200).max(1)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test
/// by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Markets Rally!"), "markets-rally");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special@#$Characters"), "specialcharacters");
        assert_eq!(
            slugify("Trade Talks: A 'Fragile' Truce"),
            "trade-talks-a-fragile-truce"
        );
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("hello"), "Hello");
        assert_eq!(upcase("world"), "World");
        assert_eq!(upcase(""), "");
        assert_eq!(upcase("a"), "A");
    }

    #[test]
    fn test_word_count_and_reading_time() {
        assert_eq!(word_count("one two three"), 3);
        assert_eq!(reading_time_minutes("quick brief"), 1);
        let long = "word ".repeat(450);
        assert_eq!(reading_time_minutes(&long), 2);
    }

    #[test]
    fn test_time_of_day_boundaries() {
        // The live clock can't be pinned in a unit test; check the boundary math instead.
        let morning = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        let morning_high = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(morning < morning_high);

        let afternoon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let afternoon_high = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        assert!(afternoon >= morning_high && afternoon < afternoon_high);

        let evening = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert!(evening >= afternoon_high);
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#; // Missing closing brace
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }
}
