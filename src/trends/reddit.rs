//! Reddit trend monitoring via the hot listings.
//!
//! Authenticates with the client-credentials grant, then walks the hot
//! listing of each monitored subreddit. Engagement is the post score plus
//! its comment count, which makes Reddit the loudest source in the report;
//! the trend scorer's source-spread bonus keeps it from drowning out the
//! wire feeds entirely.

use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, error, info, instrument};

use super::{TrendObservation, matching_keyword};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));
const LISTING_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

/// The slice of a Reddit post the monitor cares about.
#[derive(Debug, Deserialize)]
pub(crate) struct Post {
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: String,
}

/// Walk every subreddit's hot listing and keep matching posts in the window.
///
/// Token or listing failures are logged; a dead subreddit contributes
/// nothing and the rest continue.
#[instrument(level = "info", skip_all, fields(subreddits = subreddits.len()))]
pub async fn observe(
    client_id: &str,
    client_secret: &str,
    subreddits: &[String],
    keywords: &[String],
    cutoff: DateTime<Utc>,
) -> Vec<TrendObservation> {
    let client = match reqwest::Client::builder().user_agent(USER_AGENT).build() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build Reddit HTTP client");
            return Vec::new();
        }
    };

    let token = match fetch_token(&client, client_id, client_secret).await {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Reddit token request failed; skipping Reddit");
            return Vec::new();
        }
    };

    let observations: Vec<TrendObservation> = stream::iter(subreddits.iter().cloned())
        .then(|subreddit| {
            let client = client.clone();
            let token = token.clone();
            async move {
                match fetch_hot(&client, &token, &subreddit).await {
                    Ok(posts) => {
                        debug!(%subreddit, posts = posts.len(), "Fetched hot listing");
                        post_observations(&subreddit, &posts, keywords, cutoff)
                    }
                    Err(e) => {
                        error!(error = %e, %subreddit, "Hot listing fetch failed");
                        Vec::new()
                    }
                }
            }
        })
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    info!(count = observations.len(), "Collected Reddit observations");
    observations
}

async fn fetch_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
) -> Result<String, Box<dyn Error>> {
    let response = client
        .post(TOKEN_URL)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?
        .error_for_status()?;
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

async fn fetch_hot(
    client: &reqwest::Client,
    token: &str,
    subreddit: &str,
) -> Result<Vec<Post>, Box<dyn Error>> {
    let url = format!("https://oauth.reddit.com/r/{subreddit}/hot?limit={LISTING_LIMIT}");
    let listing: Listing = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(listing.data.children.into_iter().map(|c| c.data).collect())
}

/// Convert a subreddit's posts into keyword-matching observations.
pub(crate) fn post_observations(
    subreddit: &str,
    posts: &[Post],
    keywords: &[String],
    cutoff: DateTime<Utc>,
) -> Vec<TrendObservation> {
    posts
        .iter()
        .filter_map(|post| {
            let created = Utc
                .timestamp_opt(post.created_utc as i64, 0)
                .single()
                .unwrap_or_else(Utc::now);
            if created <= cutoff {
                return None;
            }
            let haystack = format!("{} {}", post.title, post.selftext);
            let matched = matching_keyword(&haystack, keywords)?;
            Some(TrendObservation {
                topic: post.title.clone(),
                source: format!("reddit_r_{subreddit}"),
                engagement: (post.score + post.num_comments).max(0) as u64,
                observed_at: created,
                matched_keyword: matched,
                url: Some(format!("https://reddit.com{}", post.permalink)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(title: &str, score: i64, comments: i64, created: DateTime<Utc>) -> Post {
        Post {
            title: title.to_string(),
            selftext: String::new(),
            score,
            num_comments: comments,
            created_utc: created.timestamp() as f64,
            permalink: "/r/test/comments/1".to_string(),
        }
    }

    #[test]
    fn test_listing_deserializes() {
        let json = r#"{
            "data": {
                "children": [
                    {"data": {"title": "Economy in freefall", "score": 120,
                              "num_comments": 45, "created_utc": 1767225600.0,
                              "permalink": "/r/economics/comments/abc"}}
                ]
            }
        }"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        let post = &listing.data.children[0].data;
        assert_eq!(post.title, "Economy in freefall");
        assert_eq!(post.score, 120);
        assert_eq!(post.selftext, "");
    }

    #[test]
    fn test_post_observations_filter_and_score() {
        let now = Utc::now();
        let posts = vec![
            post("Economy rebounds strongly", 100, 30, now - Duration::hours(2)),
            post("Cute cat pictures", 9000, 500, now - Duration::hours(1)),
            post("Old economy thread", 50, 10, now - Duration::hours(40)),
        ];
        let keywords = vec!["economy".to_string()];
        let cutoff = now - Duration::hours(24);

        let observations = post_observations("economics", &posts, &keywords, cutoff);
        assert_eq!(observations.len(), 1);
        let obs = &observations[0];
        assert_eq!(obs.source, "reddit_r_economics");
        assert_eq!(obs.engagement, 130);
        assert!(obs.url.as_deref().unwrap().starts_with("https://reddit.com/"));
    }

    #[test]
    fn test_negative_score_clamps_to_zero() {
        let now = Utc::now();
        let posts = vec![post("economy doom", -50, 10, now)];
        let observations = post_observations(
            "economics",
            &posts,
            &["economy".to_string()],
            now - Duration::hours(1),
        );
        assert_eq!(observations[0].engagement, 0);
    }
}
