//! AI article drafting: prompt construction and response handling.
//!
//! The desk asks an LLM for a structured draft (title, subtitle, excerpt,
//! body, meta description, tags) as JSON. Models being models, the response
//! may come back fenced, truncated, or as loose prose; this module carries
//! the salvage paths so a bad response degrades to a rough draft instead of
//! a lost article.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument, warn};

use crate::api::{ChatClient, Provider, ask_with_backoff};
use crate::utils::{looks_truncated, truncate_for_log, word_count};

/// The register an article is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleType {
    News,
    Analysis,
    Opinion,
}

impl ArticleType {
    pub fn parse(s: &str) -> Option<ArticleType> {
        match s.to_lowercase().as_str() {
            "news" => Some(ArticleType::News),
            "analysis" => Some(ArticleType::Analysis),
            "opinion" => Some(ArticleType::Opinion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleType::News => "news",
            ArticleType::Analysis => "analysis",
            ArticleType::Opinion => "opinion",
        }
    }
}

/// Default model per provider and article type.
pub fn default_model(provider: Provider, article_type: ArticleType) -> &'static str {
    match (provider, article_type) {
        (Provider::OpenAi, ArticleType::News) => "gpt-4-turbo",
        (Provider::OpenAi, _) => "gpt-4",
        (Provider::Claude, ArticleType::Analysis) => "claude-3-opus",
        (Provider::Claude, _) => "claude-3-sonnet",
        (Provider::DeepSeek, _) => "deepseek-chat",
    }
}

/// Published price per thousand tokens, for the cost estimate shown to
/// editors before a batch run.
pub fn cost_per_1k_tokens(provider: Provider) -> f64 {
    match provider {
        Provider::OpenAi => 0.03,
        Provider::Claude => 0.015,
        Provider::DeepSeek => 0.002,
    }
}

/// Rough cost of generating `word_count` words (1 word ≈ 1.3 tokens).
pub fn estimate_cost(word_count: u32, provider: Provider) -> f64 {
    let estimated_tokens = (word_count as f64 * 1.3).floor();
    (estimated_tokens / 1000.0) * cost_per_1k_tokens(provider)
}

/// What the desk wants drafted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub category: String,
    pub article_type: ArticleType,
    pub keywords: Vec<String>,
    pub target_length: u32,
}

/// The structured draft the model is asked to return.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratedArticle {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured_image_prompt: String,
    #[serde(default)]
    pub readability_score: f64,
    #[serde(default)]
    pub estimated_read_time: u32,
}

/// A draft plus the call metadata an editor wants on the record.
#[derive(Debug, Clone)]
pub struct Generated {
    pub article: GeneratedArticle,
    pub provider: Provider,
    pub model: String,
    pub tokens_used: u64,
    pub cost: f64,
}

/// Build the drafting prompt for one article.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let keyword_text = if request.keywords.is_empty() {
        String::new()
    } else {
        format!(
            "Keywords to naturally incorporate: {}",
            request.keywords.join(", ")
        )
    };

    let mut prompt = format!(
        r#"You are a professional journalist writing for a sophisticated news publication similar to The Atlantic, NBC News, or The Guardian.

Write a {article_type} article about: {topic}

Category: {category}
Target length: {target_length} words
{keyword_text}

Requirements:
1. Write in a professional, engaging journalistic style
2. Use clear, modern prose with varied sentence structure
3. Include proper journalistic structure (headline, subtitle, body paragraphs)
4. Ensure factual accuracy and balanced perspective
5. Use active voice and compelling storytelling
6. Include relevant context and background information
7. End with a thoughtful conclusion

Format your response as JSON with the following structure:
{{
    "title": "Compelling headline (60-80 characters)",
    "subtitle": "Engaging subtitle that expands on the headline",
    "excerpt": "Brief summary for social media and previews (150-200 characters)",
    "content": "Full article content in markdown format",
    "meta_description": "SEO meta description (150-160 characters)",
    "tags": ["tag1", "tag2", "tag3"],
    "featured_image_prompt": "Description for AI image generation",
    "readability_score": 8.5,
    "estimated_read_time": 4
}}

Article Type Guidelines:
"#,
        article_type = request.article_type.as_str(),
        topic = request.topic,
        category = request.category,
        target_length = request.target_length,
    );

    prompt.push_str(match request.article_type {
        ArticleType::News => {
            "\n- Focus on recent developments and breaking news\n\
             - Use inverted pyramid structure (most important info first)\n\
             - Include quotes from relevant sources\n\
             - Maintain objectivity and factual reporting\n\
             - Answer who, what, when, where, why, and how\n"
        }
        ArticleType::Analysis => {
            "\n- Provide deep analysis and expert perspective\n\
             - Explore implications and broader context\n\
             - Use data and evidence to support arguments\n\
             - Consider multiple viewpoints and scenarios\n\
             - Offer insights beyond surface-level reporting\n"
        }
        ArticleType::Opinion => {
            "\n- Present a clear, well-reasoned argument\n\
             - Use personal voice while maintaining professionalism\n\
             - Support opinions with facts and evidence\n\
             - Acknowledge counterarguments\n\
             - Conclude with a strong, memorable statement\n"
        }
    });

    prompt
}

/// Pick a register from what the topic string sounds like.
pub fn determine_article_type(topic: &str) -> ArticleType {
    let topic_lower = topic.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| topic_lower.contains(w));

    if any(&["breaking", "urgent", "crisis", "emergency"]) {
        ArticleType::News
    } else if any(&["analysis", "study", "research", "report"])
        || any(&["investigation", "scandal", "expose", "reveal"])
    {
        ArticleType::Analysis
    } else if any(&["opinion", "debate", "controversy", "argue"]) {
        ArticleType::Opinion
    } else {
        ArticleType::News
    }
}

/// Draft one article through the configured client.
///
/// A truncation-shaped JSON failure gets exactly one re-ask; any other
/// malformed response falls back to plain-text salvage.
#[instrument(level = "info", skip_all, fields(topic = %request.topic))]
pub async fn generate(
    client: &ChatClient,
    request: &GenerationRequest,
) -> Result<Generated, Box<dyn Error>> {
    let prompt = build_prompt(request);
    let mut reply = ask_with_backoff(client, &prompt).await?;
    let mut tokens_used = reply.tokens_used;

    let cleaned = strip_code_fences(&reply.content).to_string();
    let mut article = match try_parse_json(&cleaned) {
        JsonOutcome::Parsed(article) => Some(article),
        JsonOutcome::Truncated(e) => {
            warn!(error = %e, "Draft JSON looks truncated; re-asking once");
            match ask_with_backoff(client, &prompt).await {
                Ok(second) => {
                    tokens_used += second.tokens_used;
                    reply = second;
                    match try_parse_json(strip_code_fences(&reply.content)) {
                        JsonOutcome::Parsed(article) => Some(article),
                        _ => None,
                    }
                }
                Err(e2) => {
                    warn!(error = %e2, "Re-ask failed; salvaging first response");
                    None
                }
            }
        }
        JsonOutcome::NotJson => None,
        JsonOutcome::Malformed(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&cleaned, 300),
                "Draft JSON did not conform; salvaging"
            );
            None
        }
    }
    .unwrap_or_else(|| salvage(strip_code_fences(&reply.content)));

    // models repeat themselves; keep tag lists clean
    article.tags = article.tags.into_iter().unique().collect();
    if article.estimated_read_time == 0 {
        article.estimated_read_time = (word_count(&article.content) as u32 / 200).max(1);
    }

    info!(
        title = %article.title,
        tokens = tokens_used,
        "Draft generated"
    );

    Ok(Generated {
        cost: (tokens_used as f64 / 1000.0) * cost_per_1k_tokens(client.provider()),
        article,
        provider: client.provider(),
        model: client.model().to_string(),
        tokens_used,
    })
}

enum JsonOutcome {
    Parsed(GeneratedArticle),
    Truncated(serde_json::Error),
    Malformed(serde_json::Error),
    NotJson,
}

fn try_parse_json(content: &str) -> JsonOutcome {
    let trimmed = content.trim_start();
    if !trimmed.starts_with('{') {
        return JsonOutcome::NotJson;
    }
    match serde_json::from_str::<GeneratedArticle>(trimmed) {
        Ok(article) => JsonOutcome::Parsed(article),
        Err(e) if looks_truncated(&e) => JsonOutcome::Truncated(e),
        Err(e) => JsonOutcome::Malformed(e),
    }
}

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[a-zA-Z]*\s*\n?|\n?```\s*$").unwrap());

/// Remove a surrounding Markdown code fence, if present.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let mut stripped = trimmed;
    if let Some(m) = FENCE_RE.find(stripped) {
        stripped = &stripped[m.end()..];
    }
    if let Some(idx) = stripped.rfind("```") {
        stripped = &stripped[..idx];
    }
    stripped.trim()
}

/// Build a usable draft out of loose prose.
///
/// The first non-empty line becomes the title (markdown heading markers
/// stripped); leading words become the excerpt and meta description.
pub fn salvage(content: &str) -> GeneratedArticle {
    let title = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| "Generated Article".to_string());

    let words: Vec<&str> = content.split_whitespace().collect();
    let (excerpt, meta_description) = if words.len() > 20 {
        (
            format!("{}...", words[..25.min(words.len())].join(" ")),
            format!("{}...", words[..20].join(" ")),
        )
    } else {
        (content.trim().to_string(), content.trim().to_string())
    };

    GeneratedArticle {
        title,
        subtitle: String::new(),
        excerpt,
        content: content.to_string(),
        meta_description,
        tags: Vec::new(),
        featured_image_prompt: String::new(),
        readability_score: 7.0,
        estimated_read_time: (words.len() as u32 / 200).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            topic: "Grid storage reshapes power markets".to_string(),
            category: "Business".to_string(),
            article_type: ArticleType::Analysis,
            keywords: vec!["battery".to_string(), "grid".to_string()],
            target_length: 800,
        }
    }

    #[test]
    fn test_prompt_carries_request_and_contract() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("Write a analysis article about: Grid storage"));
        assert!(prompt.contains("Category: Business"));
        assert!(prompt.contains("Target length: 800 words"));
        assert!(prompt.contains("Keywords to naturally incorporate: battery, grid"));
        assert!(prompt.contains("\"title\": \"Compelling headline"));
        assert!(prompt.contains("Provide deep analysis"));
        assert!(!prompt.contains("inverted pyramid"));
    }

    #[test]
    fn test_prompt_omits_empty_keyword_line() {
        let mut req = request();
        req.keywords.clear();
        assert!(!build_prompt(&req).contains("Keywords to naturally incorporate"));
    }

    #[test]
    fn test_parse_well_formed_json() {
        let json = r#"{"title": "Headline", "content": "Body text", "tags": ["a", "a", "b"]}"#;
        match try_parse_json(json) {
            JsonOutcome::Parsed(article) => {
                assert_eq!(article.title, "Headline");
                assert_eq!(article.subtitle, "");
            }
            _ => panic!("expected parse"),
        }
    }

    #[test]
    fn test_truncated_json_detected() {
        let json = r#"{"title": "Headline", "content": "Body te"#;
        assert!(matches!(try_parse_json(json), JsonOutcome::Truncated(_)));
    }

    #[test]
    fn test_strip_code_fences() {
        let fenced = "```json\n{\"title\": \"T\"}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"title\": \"T\"}");
        assert_eq!(strip_code_fences("plain text"), "plain text");
        assert_eq!(strip_code_fences("```\nabc\n```"), "abc");
    }

    #[test]
    fn test_salvage_plain_prose() {
        let prose = "# A Big Headline\n\nFirst paragraph of the piece follows here with \
                     enough words to trip the excerpt branch of the salvage logic and then some.";
        let article = salvage(prose);
        assert_eq!(article.title, "A Big Headline");
        assert!(article.excerpt.ends_with("..."));
        assert!(article.content.contains("First paragraph"));
        assert_eq!(article.estimated_read_time, 1);
    }

    #[test]
    fn test_salvage_short_content() {
        let article = salvage("Too short to trim.");
        assert_eq!(article.title, "Too short to trim.");
        assert_eq!(article.excerpt, "Too short to trim.");
    }

    #[test]
    fn test_determine_article_type() {
        assert_eq!(
            determine_article_type("Breaking: floods hit the coast"),
            ArticleType::News
        );
        assert_eq!(
            determine_article_type("New study on remote work"),
            ArticleType::Analysis
        );
        assert_eq!(
            determine_article_type("Scandal reveals procurement failures"),
            ArticleType::Analysis
        );
        assert_eq!(
            determine_article_type("The debate over congestion pricing"),
            ArticleType::Opinion
        );
        assert_eq!(
            determine_article_type("City opens new transit line"),
            ArticleType::News
        );
    }

    #[test]
    fn test_cost_estimate() {
        // 1000 words ≈ 1300 tokens
        let cost = estimate_cost(1000, Provider::OpenAi);
        assert!((cost - 0.039).abs() < 1e-9);
        assert!(estimate_cost(1000, Provider::DeepSeek) < cost);
    }

    #[test]
    fn test_default_models() {
        assert_eq!(default_model(Provider::OpenAi, ArticleType::News), "gpt-4-turbo");
        assert_eq!(default_model(Provider::OpenAi, ArticleType::Opinion), "gpt-4");
        assert_eq!(
            default_model(Provider::Claude, ArticleType::Analysis),
            "claude-3-opus"
        );
        assert_eq!(default_model(Provider::DeepSeek, ArticleType::News), "deepseek-chat");
    }
}
