//! RSS/Atom feed monitoring.
//!
//! Feeds are fetched with `reqwest` and parsed with a small event-driven
//! `quick-xml` reader that understands RSS 2.0 `<item>`s and Atom
//! `<entry>`s. RSS carries no engagement metric, so every matching entry
//! counts as engagement 1; the scoring value of feeds comes from the
//! source-spread bonus, not raw numbers.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::error::Error;
use tracing::{debug, error, info, instrument};

use super::{TrendObservation, matching_keyword};

/// One entry pulled out of a feed document.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// A parsed feed: its title plus its entries.
#[derive(Debug, Default)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Fetch every feed and keep the keyword-matching entries inside the window.
///
/// A feed that fails to download or parse is logged and skipped.
#[instrument(level = "info", skip_all, fields(feeds = feed_urls.len()))]
pub async fn observe(
    feed_urls: &[String],
    keywords: &[String],
    cutoff: DateTime<Utc>,
) -> Vec<TrendObservation> {
    let now = Utc::now();
    let observations: Vec<TrendObservation> = stream::iter(feed_urls.iter().cloned())
        .then(|url| async move {
            match fetch_feed(&url).await {
                Ok(feed) => {
                    debug!(%url, entries = feed.entries.len(), "Fetched feed");
                    Some(feed)
                }
                Err(e) => {
                    error!(error = %e, %url, "Feed fetch failed");
                    None
                }
            }
        })
        .filter_map(|opt| std::future::ready(opt))
        .map(|feed| entry_observations(&feed, keywords, cutoff, now))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    info!(count = observations.len(), "Collected RSS observations");
    observations
}

/// Per-keyword Google News search feed.
///
/// Cheapest way to watch the whole wire for one topic; the query string has
/// to be percent-encoded since keywords may be multi-word phrases.
pub fn google_news_feed_url(keyword: &str) -> String {
    format!(
        "https://news.google.com/rss/search?q={}&hl=en-US&gl=US&ceid=US:en",
        urlencoding::encode(keyword)
    )
}

async fn fetch_feed(url: &str) -> Result<Feed, Box<dyn Error>> {
    let body = reqwest::get(url).await?.text().await?;
    parse_feed(&body)
}

/// Turn a feed's entries into keyword-matching observations.
pub(crate) fn entry_observations(
    feed: &Feed,
    keywords: &[String],
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<TrendObservation> {
    let source = format!(
        "news_rss_{}",
        feed.title.as_deref().unwrap_or("unknown")
    );
    feed.entries
        .iter()
        .filter_map(|entry| {
            let published = entry.published.unwrap_or(now);
            if published <= cutoff {
                return None;
            }
            let haystack = format!("{} {}", entry.title, entry.summary);
            let matched = matching_keyword(&haystack, keywords)?;
            Some(TrendObservation {
                topic: entry.title.clone(),
                source: source.clone(),
                engagement: 1,
                observed_at: published,
                matched_keyword: matched,
                url: entry.link.clone(),
            })
        })
        .collect()
}

/// Parse an RSS 2.0 or Atom document.
///
/// Only the fields the monitor needs are read: feed title, entry title,
/// summary/description, link, and publication time (RFC 2822 `pubDate` or
/// RFC 3339 `published`/`updated`).
pub fn parse_feed(xml: &str) -> Result<Feed, Box<dyn Error>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut entry: Option<FeedEntry> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" || name == "entry" {
                    entry = Some(FeedEntry::default());
                }
                read_link_href(&e, &mut entry);
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                // Atom's self-closing <link href="..."/>
                read_link_href(&e, &mut entry);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if name == "item" || name == "entry" {
                        if let Some(done) = entry.take() {
                            feed.entries.push(done);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .xml_content()
                    .map(|c| c.into_owned())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                apply_text(&mut feed, &mut entry, &path, &text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).trim().to_string();
                if text.is_empty() {
                    continue;
                }
                apply_text(&mut feed, &mut entry, &path, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Box::new(e)),
            _ => {}
        }
    }

    Ok(feed)
}

fn read_link_href(e: &quick_xml::events::BytesStart<'_>, entry: &mut Option<FeedEntry>) {
    if e.name().as_ref() != b"link" {
        return;
    }
    let Some(current) = entry.as_mut() else {
        return;
    };
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"href" {
            current.link = Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
}

fn apply_text(feed: &mut Feed, entry: &mut Option<FeedEntry>, path: &[String], text: &str) {
    let Some(tag) = path.last() else {
        return;
    };
    match entry {
        Some(current) => match tag.as_str() {
            "title" => current.title = text.to_string(),
            "description" | "summary" => current.summary = text.to_string(),
            "link" => current.link = Some(text.to_string()),
            "pubDate" => {
                current.published = DateTime::parse_from_rfc2822(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
            "published" | "updated" => {
                current.published = current.published.or_else(|| {
                    DateTime::parse_from_rfc3339(text)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                });
            }
            _ => {}
        },
        None => {
            // channel/feed level
            if tag == "title" && feed.title.is_none() {
                feed.title = Some(text.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>World Wire</title>
    <item>
      <title>Economy rebounds in third quarter</title>
      <link>https://example.com/economy-rebounds</link>
      <description>Growth beat forecasts as trade volumes recovered.</description>
      <pubDate>Mon, 03 Aug 2026 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Football final draws record crowd</title>
      <link>https://example.com/football</link>
      <description>A record attendance at the stadium.</description>
      <pubDate>Mon, 03 Aug 2026 13:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Wire</title>
  <entry>
    <title>Climate summit opens</title>
    <link href="https://example.com/climate-summit"/>
    <summary>Delegates arrive for the climate talks.</summary>
    <updated>2026-08-03T09:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_sample() {
        let feed = parse_feed(RSS_SAMPLE).unwrap();
        assert_eq!(feed.title.as_deref(), Some("World Wire"));
        assert_eq!(feed.entries.len(), 2);
        let first = &feed.entries[0];
        assert_eq!(first.title, "Economy rebounds in third quarter");
        assert_eq!(first.link.as_deref(), Some("https://example.com/economy-rebounds"));
        assert!(first.published.is_some());
        assert!(first.summary.contains("trade volumes"));
    }

    #[test]
    fn test_parse_atom_sample() {
        let feed = parse_feed(ATOM_SAMPLE).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Atom Wire"));
        assert_eq!(feed.entries.len(), 1);
        let entry = &feed.entries[0];
        assert_eq!(entry.title, "Climate summit opens");
        assert_eq!(entry.link.as_deref(), Some("https://example.com/climate-summit"));
        assert!(entry.published.is_some());
    }

    #[test]
    fn test_entry_observations_filter_by_keyword_and_window() {
        let feed = parse_feed(RSS_SAMPLE).unwrap();
        let keywords = vec!["economy".to_string()];
        let published = feed.entries[0].published.unwrap();

        // window includes the entries
        let observations =
            entry_observations(&feed, &keywords, published - Duration::hours(1), published);
        assert_eq!(observations.len(), 1);
        let obs = &observations[0];
        assert_eq!(obs.source, "news_rss_World Wire");
        assert_eq!(obs.engagement, 1);
        assert_eq!(obs.matched_keyword, "economy");

        // window excludes everything
        let stale =
            entry_observations(&feed, &keywords, published + Duration::hours(1), published);
        assert!(stale.is_empty());
    }

    #[test]
    fn test_google_news_feed_url_encodes_keyword() {
        let url = google_news_feed_url("climate change");
        assert!(url.starts_with("https://news.google.com/rss/search?q=climate%20change"));
    }

    #[test]
    fn test_undated_entries_count_as_fresh() {
        let feed = Feed {
            title: None,
            entries: vec![FeedEntry {
                title: "Economy watch".to_string(),
                summary: String::new(),
                link: None,
                published: None,
            }],
        };
        let now = Utc::now();
        let observations = entry_observations(
            &feed,
            &["economy".to_string()],
            now - Duration::hours(24),
            now,
        );
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].source, "news_rss_unknown");
    }
}
