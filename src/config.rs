//! Newsroom configuration loaded from `config.yaml`.
//!
//! Everything has a workable default so `newsdesk init` runs without a
//! config file; a YAML file fills in API credentials, the monitored feed
//! and subreddit lists, and generation preferences. Provider API keys are
//! additionally overridable from the environment (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `DEEPSEEK_API_KEY`, `REDDIT_CLIENT_ID`,
//! `REDDIT_CLIENT_SECRET`), which wins over the file.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Top-level configuration for the desk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Directory holding the JSON collections.
    pub data_dir: String,
    pub providers: ProvidersConfig,
    pub trends: TrendsConfig,
    pub generation: GenerationConfig,
    pub comments: CommentsConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            data_dir: "./newsroom".to_string(),
            providers: ProvidersConfig::default(),
            trends: TrendsConfig::default(),
            generation: GenerationConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

/// Credentials and endpoints for the LLM providers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub claude: ProviderConfig,
    pub deepseek: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    /// Base URL; the client appends the provider's completion path.
    pub api_base: Option<String>,
    /// Preferred model, overriding the per-article-type default.
    pub model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_key: None,
            api_base: None,
            model: None,
        }
    }
}

/// What the trend monitor watches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// RSS feeds polled for world-news entries.
    pub feeds: Vec<String>,
    /// Subreddits polled via the hot listing.
    pub subreddits: Vec<String>,
    /// Text-only front pages scraped for headlines.
    pub headline_pages: Vec<HeadlinePage>,
    /// Default keywords when the CLI passes none.
    pub keywords: Vec<String>,
    /// Observation window in hours.
    pub hours_back: i64,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        TrendsConfig {
            feeds: vec![
                "https://feeds.reuters.com/reuters/topNews".to_string(),
                "https://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
                "https://rss.cnn.com/rss/edition.rss".to_string(),
                "https://feeds.npr.org/1001/rss.xml".to_string(),
                "https://feeds.washingtonpost.com/rss/world".to_string(),
                "https://www.theguardian.com/world/rss".to_string(),
                "https://feeds.nytimes.com/nyt/rss/World".to_string(),
                "https://feeds.ft.com/rss/world".to_string(),
            ],
            subreddits: vec![
                "worldnews".to_string(),
                "news".to_string(),
                "politics".to_string(),
                "business".to_string(),
                "technology".to_string(),
                "economics".to_string(),
                "geopolitics".to_string(),
                "finance".to_string(),
                "investing".to_string(),
                "climate".to_string(),
                "science".to_string(),
                "futurology".to_string(),
            ],
            headline_pages: vec![
                HeadlinePage {
                    name: "cnn-lite".to_string(),
                    url: "https://lite.cnn.com".to_string(),
                    selector: ".card--lite a[href]".to_string(),
                },
                HeadlinePage {
                    name: "npr-text".to_string(),
                    url: "https://text.npr.org".to_string(),
                    selector: "ul > li > a".to_string(),
                },
            ],
            keywords: vec![
                "economy".to_string(),
                "election".to_string(),
                "climate".to_string(),
                "technology".to_string(),
                "trade".to_string(),
            ],
            hours_back: 24,
            reddit_client_id: None,
            reddit_client_secret: None,
        }
    }
}

/// A text-only front page whose link text is harvested as topic strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeadlinePage {
    pub name: String,
    pub url: String,
    /// CSS selector for headline anchors.
    pub selector: String,
}

/// Defaults for article generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub article_type: String,
    pub target_length: u32,
    /// Ceiling for `generate --auto`.
    pub max_auto_articles: usize,
    /// Concurrent LLM calls during the auto pipeline.
    pub parallel_generation: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            provider: "openai".to_string(),
            article_type: "news".to_string(),
            target_length: 800,
            max_auto_articles: 5,
            parallel_generation: 4,
        }
    }
}

/// Comment intake policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// Clean comments (spam score below the suspicion line) skip the queue.
    pub auto_approve: bool,
    pub max_depth: u32,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        CommentsConfig {
            auto_approve: true,
            max_depth: 5,
        }
    }
}

/// Load configuration, falling back to defaults when the file is absent.
///
/// Environment variables override file-provided credentials so keys can stay
/// out of checked-in config.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn load_config(path: &str) -> Result<DeskConfig, Box<dyn Error>> {
    let mut config = if Path::new(path).exists() {
        let raw = tokio::fs::read_to_string(path).await?;
        let parsed: DeskConfig = serde_yaml::from_str(&raw)?;
        info!(path, "Loaded configuration");
        parsed
    } else {
        debug!(path, "No config file; using defaults");
        DeskConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut DeskConfig) {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.providers.openai.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        config.providers.claude.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        config.providers.deepseek.api_key = Some(key);
    }
    if let Ok(id) = std::env::var("REDDIT_CLIENT_ID") {
        config.trends.reddit_client_id = Some(id);
    }
    if let Ok(secret) = std::env::var("REDDIT_CLIENT_SECRET") {
        config.trends.reddit_client_secret = Some(secret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_monitoring_lists() {
        let config = DeskConfig::default();
        assert_eq!(config.trends.hours_back, 24);
        assert!(config.trends.feeds.len() >= 8);
        assert!(config.trends.subreddits.contains(&"worldnews".to_string()));
        assert_eq!(config.generation.target_length, 800);
        assert!(config.comments.auto_approve);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
data_dir: /tmp/desk
generation:
  provider: deepseek
"#;
        let config: DeskConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.data_dir, "/tmp/desk");
        assert_eq!(config.generation.provider, "deepseek");
        // untouched sections keep their defaults
        assert_eq!(config.generation.target_length, 800);
        assert!(!config.trends.feeds.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let config = DeskConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: DeskConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.data_dir, config.data_dir);
        assert_eq!(back.trends.subreddits, config.trends.subreddits);
    }
}
