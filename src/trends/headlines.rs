//! Front-page headline monitoring.
//!
//! Text-only news homepages (CNN Lite, NPR Text) are stable enough to
//! scrape with a CSS selector from config. Every link whose text reads like
//! a headline becomes a topic observation; there is no engagement metric,
//! so these count like wire entries.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::{TrendObservation, matching_keyword};
use crate::config::HeadlinePage;

/// Link texts shorter than this many words are navigation, not headlines.
const MIN_HEADLINE_WORDS: usize = 4;

/// A headline pulled off a front page.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub text: String,
    pub url: Option<String>,
}

/// Scrape every configured front page for keyword-matching headlines.
#[instrument(level = "info", skip_all, fields(pages = pages.len()))]
pub async fn observe(pages: &[HeadlinePage], keywords: &[String]) -> Vec<TrendObservation> {
    let now = Utc::now();
    let observations: Vec<TrendObservation> = stream::iter(pages.iter().cloned())
        .then(|page| async move {
            match fetch_headlines(&page).await {
                Ok(headlines) => {
                    debug!(page = %page.name, count = headlines.len(), "Scraped front page");
                    headlines
                        .into_iter()
                        .filter_map(|headline| {
                            let matched = matching_keyword(&headline.text, keywords)?;
                            Some(TrendObservation {
                                topic: headline.text,
                                source: format!("frontpage_{}", page.name),
                                engagement: 1,
                                observed_at: now,
                                matched_keyword: matched,
                                url: headline.url,
                            })
                        })
                        .collect::<Vec<_>>()
                }
                Err(e) => {
                    error!(error = %e, page = %page.name, "Front page scrape failed");
                    Vec::new()
                }
            }
        })
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    info!(count = observations.len(), "Collected headline observations");
    observations
}

async fn fetch_headlines(page: &HeadlinePage) -> Result<Vec<Headline>, Box<dyn Error>> {
    let html = reqwest::get(&page.url).await?.text().await?;
    extract_headlines(&html, &page.selector, &page.url)
}

/// Pull headline anchors out of a page with the configured selector.
///
/// Relative hrefs are resolved against the page URL; short link texts are
/// dropped as navigation chrome.
pub(crate) fn extract_headlines(
    html: &str,
    selector: &str,
    base_url: &str,
) -> Result<Vec<Headline>, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let anchor_selector =
        Selector::parse(selector).map_err(|e| format!("bad selector {selector:?}: {e}"))?;
    let base = Url::parse(base_url)?;

    let mut headlines = Vec::new();
    for element in document.select(&anchor_selector) {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.split_whitespace().count() < MIN_HEADLINE_WORDS {
            continue;
        }
        let url = element
            .value()
            .attr("href")
            .and_then(|href| base.join(href).ok())
            .map(|resolved| resolved.to_string());
        headlines.push(Headline { text, url });
    }
    Ok(headlines)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT_PAGE: &str = r#"
<html><body>
  <div class="card--lite"><a href="/2026/08/03/economy-rebounds">Economy rebounds as trade volumes recover</a></div>
  <div class="card--lite"><a href="/2026/08/03/storm">Storm closes ports along the coast</a></div>
  <div class="card--lite"><a href="/about">About</a></div>
</body></html>"#;

    #[test]
    fn test_extract_headlines_resolves_and_filters() {
        let headlines =
            extract_headlines(FRONT_PAGE, ".card--lite a[href]", "https://lite.cnn.com").unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(
            headlines[0].text,
            "Economy rebounds as trade volumes recover"
        );
        assert_eq!(
            headlines[0].url.as_deref(),
            Some("https://lite.cnn.com/2026/08/03/economy-rebounds")
        );
        // "About" is navigation, not a headline
        assert!(headlines.iter().all(|h| h.text != "About"));
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        assert!(extract_headlines(FRONT_PAGE, ":::", "https://lite.cnn.com").is_err());
    }
}
