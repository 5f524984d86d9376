//! SEO and readability analysis for articles.
//!
//! The score is a five-check rubric worth 20 points each: title length,
//! meta description length, content length, a keyword in the title, and
//! image alt text. Readability is a simplified Flesch Reading Ease with
//! syllables approximated by vowel count. The point of the module is not
//! search-engine magic; it is a consistent checklist an editor can clear
//! before approval.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Article;

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());
static VOWEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[aeiouAEIOU]").unwrap());

/// Title and meta-tag measurements.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaAnalysis {
    pub title_length: usize,
    pub title_optimal: bool,
    pub meta_description_length: usize,
    pub meta_description_optimal: bool,
    pub has_keywords: bool,
    pub keywords_count: usize,
}

/// One word's share of the article body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeywordDensity {
    pub word: String,
    pub percent: f64,
}

/// A full analysis run for one article.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeoReport {
    pub seo_score: u32,
    pub readability: f64,
    pub keyword_density: Vec<KeywordDensity>,
    pub meta: MetaAnalysis,
    pub suggestions: Vec<String>,
}

/// A stored analysis, one per article (latest wins).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeoRecord {
    pub article_id: u64,
    #[serde(flatten)]
    pub report: SeoReport,
    pub analyzed_at: DateTime<Utc>,
}

/// Run every check against an article.
pub fn analyze(article: &Article) -> SeoReport {
    let seo_score = seo_score(article);
    let readability = readability_score(&article.content);
    SeoReport {
        seo_score,
        readability,
        keyword_density: keyword_density(&article.content),
        meta: meta_analysis(article),
        suggestions: suggestions(article, readability),
    }
}

/// The five-check rubric, 20 points each, capped at 100.
pub fn seo_score(article: &Article) -> u32 {
    let mut score = 0;

    let title_len = article.title.chars().count();
    if (30..=60).contains(&title_len) {
        score += 20;
    }

    if let Some(desc) = &article.seo_description {
        if (120..=160).contains(&desc.chars().count()) {
            score += 20;
        }
    }

    if article.content.chars().count() >= 300 {
        score += 20;
    }

    let title_lower = article.title.to_lowercase();
    if article
        .keyword_list()
        .iter()
        .any(|keyword| title_lower.contains(keyword))
    {
        score += 20;
    }

    if article.content.contains("alt=") {
        score += 20;
    }

    score.min(100)
}

/// Simplified Flesch Reading Ease, clamped to 0..=100.
///
/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`,
/// with syllables approximated as the vowel-letter count per word, floor 1.
pub fn readability_score(content: &str) -> f64 {
    let sentences = SENTENCE_RE.find_iter(content).count();
    if sentences == 0 {
        return 0.0;
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let syllables: usize = words
        .iter()
        .map(|word| VOWEL_RE.find_iter(word).count().max(1))
        .sum();

    let score = 206.835
        - 1.015 * (words.len() as f64 / sentences as f64)
        - 84.6 * (syllables as f64 / words.len() as f64);
    score.clamp(0.0, 100.0)
}

/// Share of the body taken by each of the ten most frequent words, keeping
/// only words longer than three characters, rounded to two decimals.
pub fn keyword_density(content: &str) -> Vec<KeywordDensity> {
    let words: Vec<String> = WORD_RE
        .find_iter(&content.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();
    let total = words.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for word in words {
        match counts.iter_mut().find(|(w, _)| *w == word) {
            Some((_, n)) => *n += 1,
            None => counts.push((word, 1)),
        }
    }
    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(10)
        .filter(|(word, _)| word.chars().count() > 3)
        .map(|(word, count)| KeywordDensity {
            percent: ((count as f64 / total as f64) * 100.0 * 100.0).round() / 100.0,
            word,
        })
        .collect()
}

/// Title and meta-description measurements.
pub fn meta_analysis(article: &Article) -> MetaAnalysis {
    let title_length = article.title.chars().count();
    let meta_description_length = article
        .seo_description
        .as_ref()
        .map(|d| d.chars().count())
        .unwrap_or(0);
    MetaAnalysis {
        title_length,
        title_optimal: (30..=60).contains(&title_length),
        meta_description_length,
        meta_description_optimal: (120..=160).contains(&meta_description_length),
        has_keywords: article.seo_keywords.is_some(),
        keywords_count: article.keyword_list().len(),
    }
}

/// Actionable advice for whatever the checks found wanting.
pub fn suggestions(article: &Article, readability: f64) -> Vec<String> {
    let mut out = Vec::new();
    let title_len = article.title.chars().count();

    if title_len < 30 {
        out.push("Title is too short. Consider expanding it to 30-60 characters.".to_string());
    } else if title_len > 60 {
        out.push("Title is too long. Consider shortening it to under 60 characters.".to_string());
    }

    match &article.seo_description {
        None => out.push("Add a meta description to improve search engine visibility.".to_string()),
        Some(desc) => {
            let len = desc.chars().count();
            if len < 120 {
                out.push(
                    "Meta description is too short. Expand it to 120-160 characters.".to_string(),
                );
            } else if len > 160 {
                out.push(
                    "Meta description is too long. Shorten it to under 160 characters.".to_string(),
                );
            }
        }
    }

    if article.seo_keywords.is_none() {
        out.push("Add relevant keywords to improve search rankings.".to_string());
    }

    if article.content.chars().count() < 300 {
        out.push("Content is too short. Aim for at least 300 words for better SEO.".to_string());
    }

    if readability < 60.0 {
        out.push(
            "Content readability could be improved. Use shorter sentences and simpler words."
                .to_string(),
        );
    }

    if !article.content.contains("alt=") {
        out.push("Add alt text to images for better accessibility and SEO.".to_string());
    }

    out
}
