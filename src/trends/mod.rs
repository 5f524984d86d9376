//! Trend monitoring across external sources.
//!
//! Each source module follows the same two-phase pattern: hit the source,
//! filter what came back down to keyword-matching observations inside the
//! monitoring window. Failed sources log and contribute nothing; the run
//! never aborts because one feed is down.
//!
//! # Sources
//!
//! | Source | Module | Method | Engagement |
//! |--------|--------|--------|------------|
//! | RSS feeds | [`rss`] | `quick-xml` over world-news feeds | 1 per entry |
//! | Reddit | [`reddit`] | OAuth hot listing per subreddit | score + comments |
//! | Front pages | [`headlines`] | `scraper` over text-only homepages | 1 per headline |
//!
//! Observations then flow into [`analyze`], which groups near-duplicates,
//! scores each group, and produces the ranked [`analyze::TrendReport`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::TrendsConfig;

pub mod analyze;
pub mod headlines;
pub mod reddit;
pub mod rss;

/// One sighting of a topic at one source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendObservation {
    /// The topic string (a headline or post title).
    pub topic: String,
    /// Source label, e.g. `news_rss_BBC News` or `reddit_r_worldnews`.
    pub source: String,
    /// Engagement count the source reported; 1 where the source has none.
    pub engagement: u64,
    pub observed_at: DateTime<Utc>,
    /// The monitored keyword this observation matched.
    pub matched_keyword: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Collect observations from every configured source.
///
/// `keywords` filters observations; `hours_back` bounds their age.
#[instrument(level = "info", skip_all, fields(keywords = keywords.len(), hours_back))]
pub async fn monitor(
    config: &TrendsConfig,
    keywords: &[String],
    hours_back: i64,
) -> Vec<TrendObservation> {
    let cutoff = Utc::now() - Duration::hours(hours_back);
    let mut observations = Vec::new();

    // configured feeds plus a Google News search feed per keyword
    let mut feed_urls = config.feeds.clone();
    feed_urls.extend(keywords.iter().map(|k| rss::google_news_feed_url(k)));

    let rss = rss::observe(&feed_urls, keywords, cutoff).await;
    info!(count = rss.len(), "RSS observations");
    observations.extend(rss);

    match (&config.reddit_client_id, &config.reddit_client_secret) {
        (Some(id), Some(secret)) => {
            let reddit =
                reddit::observe(id, secret, &config.subreddits, keywords, cutoff).await;
            info!(count = reddit.len(), "Reddit observations");
            observations.extend(reddit);
        }
        _ => warn!("Reddit credentials not configured; skipping subreddit monitoring"),
    }

    let headlines = headlines::observe(&config.headline_pages, keywords).await;
    info!(count = headlines.len(), "Headline observations");
    observations.extend(headlines);

    info!(total = observations.len(), "Trend monitoring complete");
    observations
}

/// The monitored keyword matching `text`, if any (case-insensitive).
pub(crate) fn matching_keyword(text: &str, keywords: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .find(|k| lower.contains(&k.to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_keyword_is_case_insensitive() {
        let keywords = vec!["Economy".to_string(), "climate".to_string()];
        assert_eq!(
            matching_keyword("CLIMATE summit opens", &keywords),
            Some("climate".to_string())
        );
        assert_eq!(
            matching_keyword("economy rebounds", &keywords),
            Some("Economy".to_string())
        );
        assert_eq!(matching_keyword("sports roundup", &keywords), None);
    }

    #[test]
    fn test_first_keyword_wins() {
        let keywords = vec!["trade".to_string(), "tariff".to_string()];
        assert_eq!(
            matching_keyword("trade war tariff threat", &keywords),
            Some("trade".to_string())
        );
    }
}
