//! Grouping, scoring, and ranking of trend observations.
//!
//! Near-duplicate topics are grouped by Jaccard word-set overlap (threshold
//! 0.6), each group is scored by engagement, source spread, recency, and
//! mention count, and the result is a report sorted hottest-first.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::TrendObservation;

/// Word-overlap threshold above which two topics count as the same story.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());
static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());

/// Words too common to be trending on their own.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from",
        "up", "about", "into", "through", "during", "before", "after", "above", "below",
        "between", "among", "this", "that", "these", "those", "his", "her", "its", "their",
        "what", "which", "who", "when", "where", "why", "how", "all", "any", "both", "each",
        "few", "more", "most", "other", "some", "such", "only", "own", "same", "than", "too",
        "very", "can", "will", "just", "should", "now", "said", "says", "new",
    ]
    .into_iter()
    .collect()
});

/// One ranked story in the trend report.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendEntry {
    /// Representative topic: the first observation in the group.
    pub topic: String,
    /// Distinct source labels that carried the story.
    pub sources: Vec<String>,
    pub total_engagement: u64,
    pub mention_count: usize,
    pub matched_keywords: Vec<String>,
    pub trend_score: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub urls: Vec<String>,
    /// Mentions per hour across the group's observed span.
    pub velocity: f64,
}

/// A full monitoring run's ranked output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendReport {
    pub generated_at: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub hours_back: i64,
    pub entries: Vec<TrendEntry>,
}

/// Group, score, and rank observations. Empty in, empty out.
pub fn analyze(observations: &[TrendObservation], now: DateTime<Utc>) -> Vec<TrendEntry> {
    if observations.is_empty() {
        return Vec::new();
    }

    let groups = group_similar(observations);
    let mut entries: Vec<TrendEntry> = groups
        .into_iter()
        .map(|group| consolidate(&group, now))
        .collect();

    entries.sort_by(|a, b| {
        b.trend_score
            .partial_cmp(&a.trend_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

/// Greedy single-pass grouping: each ungrouped observation seeds a group and
/// pulls in every later observation whose topic is similar to the seed's.
pub fn group_similar(observations: &[TrendObservation]) -> Vec<Vec<&TrendObservation>> {
    let mut groups: Vec<Vec<&TrendObservation>> = Vec::new();
    let mut used = vec![false; observations.len()];

    for i in 0..observations.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![&observations[i]];

        for j in (i + 1)..observations.len() {
            if used[j] {
                continue;
            }
            if topics_similar(&observations[i].topic, &observations[j].topic) {
                used[j] = true;
                group.push(&observations[j]);
            }
        }
        groups.push(group);
    }
    groups
}

/// Jaccard word-set overlap at [`SIMILARITY_THRESHOLD`].
pub fn topics_similar(a: &str, b: &str) -> bool {
    let words_a = word_set(a);
    let words_b = word_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return false;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    (intersection as f64 / union as f64) >= SIMILARITY_THRESHOLD
}

fn word_set(topic: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&topic.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn consolidate(group: &[&TrendObservation], now: DateTime<Utc>) -> TrendEntry {
    let mut sources = Vec::new();
    let mut matched_keywords = Vec::new();
    let mut urls = Vec::new();
    for obs in group {
        if !sources.contains(&obs.source) {
            sources.push(obs.source.clone());
        }
        if !matched_keywords.contains(&obs.matched_keyword) {
            matched_keywords.push(obs.matched_keyword.clone());
        }
        if let Some(url) = &obs.url {
            urls.push(url.clone());
        }
    }

    let first_seen = group.iter().map(|o| o.observed_at).min().unwrap_or(now);
    let last_seen = group.iter().map(|o| o.observed_at).max().unwrap_or(now);

    TrendEntry {
        topic: group[0].topic.clone(),
        total_engagement: group.iter().map(|o| o.engagement).sum(),
        mention_count: group.len(),
        trend_score: trend_score(group, now),
        velocity: velocity(group),
        sources,
        matched_keywords,
        urls,
        first_seen,
        last_seen,
    }
}

/// Score one group:
/// `total_engagement + 10 * distinct_sources + recency_bonus + 5 * mentions`,
/// where `recency_bonus = max(0, 24 - hours_since_latest) * 2` (at most 48).
pub fn trend_score(group: &[&TrendObservation], now: DateTime<Utc>) -> f64 {
    let engagement: u64 = group.iter().map(|o| o.engagement).sum();

    let distinct_sources: HashSet<&str> = group.iter().map(|o| o.source.as_str()).collect();
    let source_bonus = distinct_sources.len() as f64 * 10.0;

    let latest = group
        .iter()
        .map(|o| o.observed_at)
        .max()
        .unwrap_or(now);
    let hours_ago = (now - latest).num_seconds() as f64 / 3600.0;
    let recency_bonus = (24.0 - hours_ago).max(0.0) * 2.0;

    let frequency_bonus = group.len() as f64 * 5.0;

    round2(engagement as f64 + source_bonus + recency_bonus + frequency_bonus)
}

/// Mentions per hour across the group's observed span; 1.0 for a singleton
/// or a zero-length span.
pub fn velocity(group: &[&TrendObservation]) -> f64 {
    if group.len() < 2 {
        return 1.0;
    }
    let first = group.iter().map(|o| o.observed_at).min().unwrap();
    let last = group.iter().map(|o| o.observed_at).max().unwrap();
    let span_secs = (last - first).num_seconds();
    if span_secs == 0 {
        return 1.0;
    }
    round2(group.len() as f64 / (span_secs as f64 / 3600.0))
}

/// Words appearing at least `min_frequency` times across the samples, stop
/// words removed, most frequent first.
pub fn trending_keywords(samples: &[String], min_frequency: usize) -> Vec<(String, usize)> {
    let combined = samples.join(" ").to_lowercase();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for m in KEYWORD_RE.find_iter(&combined) {
        let word = m.as_str();
        if STOP_WORDS.contains(word) {
            continue;
        }
        match counts.iter_mut().find(|(w, _)| w == word) {
            Some((_, n)) => *n += 1,
            None => counts.push((word.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.retain(|(_, n)| *n >= min_frequency);
    counts
}

/// How well a topic matches the monitored keyword list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeywordRelevance {
    pub is_relevant: bool,
    pub matched_keywords: Vec<String>,
    /// Matched fraction of the keyword list; 0 when the list is empty.
    pub relevance_score: f64,
}

pub fn keyword_relevance(topic: &str, keywords: &[String]) -> KeywordRelevance {
    let topic_lower = topic.to_lowercase();
    let matched: Vec<String> = keywords
        .iter()
        .filter(|k| topic_lower.contains(&k.to_lowercase()))
        .cloned()
        .collect();
    let relevance_score = if keywords.is_empty() {
        0.0
    } else {
        matched.len() as f64 / keywords.len() as f64
    };
    KeywordRelevance {
        is_relevant: !matched.is_empty(),
        matched_keywords: matched,
        relevance_score,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
