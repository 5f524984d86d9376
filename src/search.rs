//! Site search over the content store.
//!
//! A query string parses into terms, quoted phrases, `-excluded` words, and
//! inline `key:value` filters. Matching is AND over terms and phrases with
//! exclusions subtracted; results sort by computed relevance or by one of
//! the fixed orders. Relevance is a weighted sum (title hits count triple,
//! tags two-and-a-half, body occurrences capped so a keyword-stuffed body
//! can't buy the top slot) scaled by recency and popularity multipliers.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use tracing::{debug, info, instrument};

use crate::models::{Article, ArticleStatus};
use crate::store::Store;

pub const MIN_QUERY_LENGTH: usize = 2;
pub const MAX_RESULTS_PER_PAGE: usize = 50;
pub const DEFAULT_RESULTS_PER_PAGE: usize = 10;

const TITLE_WEIGHT: f64 = 3.0;
const EXCERPT_WEIGHT: f64 = 2.0;
const CONTENT_WEIGHT: f64 = 1.0;
const TAG_WEIGHT: f64 = 2.5;
const AUTHOR_WEIGHT: f64 = 1.5;
/// Body occurrences beyond this stop counting.
const CONTENT_OCCURRENCE_CAP: usize = 5;

static PHRASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());
static EXCLUDED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\w+)").unwrap());
static FILTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+):(\w+)").unwrap());
static TERM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// A query string broken into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub terms: Vec<String>,
    pub phrases: Vec<String>,
    pub excluded: Vec<String>,
    pub filters: HashMap<String, String>,
    pub original: String,
}

/// Parse a raw query string.
///
/// Phrases are pulled out first, then exclusions, then `key:value` filters;
/// whatever words remain (at least [`MIN_QUERY_LENGTH`] chars) become terms.
pub fn parse_query(query: &str) -> ParsedQuery {
    let original = query.trim().to_string();

    let phrases: Vec<String> = PHRASE_RE
        .captures_iter(query)
        .map(|c| c[1].trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let without_phrases = PHRASE_RE.replace_all(query, "");

    let excluded: Vec<String> = EXCLUDED_RE
        .captures_iter(&without_phrases)
        .map(|c| c[1].to_lowercase())
        .collect();
    let without_excluded = EXCLUDED_RE.replace_all(&without_phrases, "");

    let filters: HashMap<String, String> = FILTER_RE
        .captures_iter(&without_excluded)
        .map(|c| (c[1].to_lowercase(), c[2].to_lowercase()))
        .collect();
    let without_filters = FILTER_RE.replace_all(&without_excluded, "");

    let terms: Vec<String> = TERM_RE
        .find_iter(&without_filters)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() >= MIN_QUERY_LENGTH)
        .collect();

    ParsedQuery {
        terms,
        phrases,
        excluded,
        filters,
        original,
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    DateDesc,
    DateAsc,
    Popularity,
    Alphabetical,
}

impl SortOrder {
    /// Unknown sort names fall back to relevance, matching the old API.
    pub fn parse(s: &str) -> SortOrder {
        match s.to_lowercase().as_str() {
            "date_desc" => SortOrder::DateDesc,
            "date_asc" => SortOrder::DateAsc,
            "popularity" => SortOrder::Popularity,
            "alphabetical" => SortOrder::Alphabetical,
            _ => SortOrder::Relevance,
        }
    }
}

/// How far back `published_at` may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    All,
    Today,
    Week,
    Month,
    ThreeMonths,
    SixMonths,
    Year,
}

impl DateRange {
    /// Unknown ranges fall back to `All`.
    pub fn parse(s: &str) -> DateRange {
        match s.to_lowercase().as_str() {
            "today" => DateRange::Today,
            "week" => DateRange::Week,
            "month" => DateRange::Month,
            "3months" => DateRange::ThreeMonths,
            "6months" => DateRange::SixMonths,
            "year" => DateRange::Year,
            _ => DateRange::All,
        }
    }

    /// The earliest acceptable publication time, if the range bounds one.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::All => None,
            DateRange::Today => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| naive.and_utc())
                    .unwrap_or(now),
            ),
            DateRange::Week => Some(now - Duration::days(7)),
            DateRange::Month => Some(now - Duration::days(30)),
            DateRange::ThreeMonths => Some(now - Duration::days(90)),
            DateRange::SixMonths => Some(now - Duration::days(180)),
            DateRange::Year => Some(now - Duration::days(365)),
        }
    }
}

/// Everything one search call needs.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub sort: SortOrder,
    pub date_range: DateRange,
    pub category_ids: Vec<u64>,
    pub author_ids: Vec<u64>,
    pub page: usize,
    pub per_page: usize,
}

impl SearchRequest {
    pub fn new(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            sort: SortOrder::Relevance,
            date_range: DateRange::All,
            category_ids: Vec::new(),
            author_ids: Vec::new(),
            page: 1,
            per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }
}

/// One result row.
#[derive(Debug)]
pub struct SearchHit<'a> {
    pub article: &'a Article,
    /// Present only under relevance sorting.
    pub relevance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub pages: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// A page of results.
#[derive(Debug)]
pub struct SearchPage<'a> {
    pub hits: Vec<SearchHit<'a>>,
    pub pagination: Pagination,
    pub parsed: ParsedQuery,
}

/// Run a search against the store.
#[instrument(level = "info", skip_all, fields(query = %request.query))]
pub fn search<'a>(
    store: &'a Store,
    request: &SearchRequest,
    now: DateTime<Utc>,
) -> Result<SearchPage<'a>, Box<dyn Error>> {
    if request.query.trim().chars().count() < MIN_QUERY_LENGTH {
        return Err(format!(
            "search query must be at least {MIN_QUERY_LENGTH} characters long"
        )
        .into());
    }

    let parsed = parse_query(&request.query);
    debug!(?parsed, "Parsed search query");

    // inline key:value filters; unknown keys are ignored
    let mut status = ArticleStatus::Published;
    let mut category_ids = request.category_ids.clone();
    let mut author_ids = request.author_ids.clone();
    for (key, value) in &parsed.filters {
        match key.as_str() {
            "status" => {
                if let Some(parsed_status) = ArticleStatus::parse(value) {
                    status = parsed_status;
                }
            }
            "category" => {
                if let Some(category) = store.category_by_slug(value) {
                    category_ids.push(category.id);
                }
            }
            "author" => {
                if let Some(author) = store.user_by_username(value) {
                    author_ids.push(author.id);
                }
            }
            _ => {}
        }
    }

    let cutoff = request.date_range.cutoff(now);
    let mut matched: Vec<&Article> = store
        .articles
        .iter()
        .filter(|article| article.status == status)
        .filter(|article| matches_query(article, &parsed))
        .filter(|article| match cutoff {
            Some(cutoff) => article
                .published_at
                .map(|at| at >= cutoff)
                .unwrap_or(false),
            None => true,
        })
        .filter(|article| category_ids.is_empty() || category_ids.contains(&article.category_id))
        .filter(|article| author_ids.is_empty() || author_ids.contains(&article.author_id))
        .collect();

    let scores: HashMap<u64, f64> = if request.sort == SortOrder::Relevance {
        matched
            .iter()
            .map(|article| {
                let author_name = store
                    .user(article.author_id)
                    .map(|u| u.full_name())
                    .unwrap_or_default();
                (
                    article.id,
                    relevance_score(article, &author_name, &parsed, now),
                )
            })
            .collect()
    } else {
        HashMap::new()
    };

    sort_results(&mut matched, request.sort, &scores);

    let per_page = request.per_page.clamp(1, MAX_RESULTS_PER_PAGE);
    let page = request.page.max(1);
    let total = matched.len();
    let pages = total.div_ceil(per_page);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);

    let hits: Vec<SearchHit> = if start < total {
        matched[start..end]
            .iter()
            .map(|&article| SearchHit {
                article,
                relevance: scores.get(&article.id).map(|s| (s * 100.0).round() / 100.0),
            })
            .collect()
    } else {
        Vec::new()
    };

    info!(total, page, "Search complete");
    Ok(SearchPage {
        hits,
        pagination: Pagination {
            page,
            pages,
            per_page,
            total,
            has_next: end < total,
            has_prev: page > 1,
        },
        parsed,
    })
}

/// AND over terms and phrases, minus exclusions.
fn matches_query(article: &Article, parsed: &ParsedQuery) -> bool {
    let title = article.title.to_lowercase();
    let content = article.content.to_lowercase();
    let excerpt = article
        .excerpt
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let tags = article.tags.join(" ").to_lowercase();

    for term in &parsed.terms {
        if !(title.contains(term)
            || content.contains(term)
            || excerpt.contains(term)
            || tags.contains(term))
        {
            return false;
        }
    }

    for phrase in &parsed.phrases {
        let phrase = phrase.to_lowercase();
        if !(title.contains(&phrase) || content.contains(&phrase) || excerpt.contains(&phrase)) {
            return false;
        }
    }

    for excluded in &parsed.excluded {
        if title.contains(excluded) || content.contains(excluded) || excerpt.contains(excluded) {
            return false;
        }
    }

    true
}

/// The weighted relevance formula.
pub fn relevance_score(
    article: &Article,
    author_name: &str,
    parsed: &ParsedQuery,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = 0.0;

    let title = article.title.to_lowercase();
    for term in &parsed.terms {
        if title.contains(term) {
            score += TITLE_WEIGHT;
        }
    }
    for phrase in &parsed.phrases {
        if title.contains(&phrase.to_lowercase()) {
            score += TITLE_WEIGHT * 1.5;
        }
    }

    if let Some(excerpt) = &article.excerpt {
        let excerpt = excerpt.to_lowercase();
        for term in &parsed.terms {
            if excerpt.contains(term) {
                score += EXCERPT_WEIGHT;
            }
        }
        for phrase in &parsed.phrases {
            if excerpt.contains(&phrase.to_lowercase()) {
                score += EXCERPT_WEIGHT * 1.5;
            }
        }
    }

    let content = article.content.to_lowercase();
    for term in &parsed.terms {
        let occurrences = content.matches(term.as_str()).count();
        score += CONTENT_WEIGHT * occurrences.min(CONTENT_OCCURRENCE_CAP) as f64;
    }

    let tags = article.tags.join(" ").to_lowercase();
    for term in &parsed.terms {
        if tags.contains(term) {
            score += TAG_WEIGHT;
        }
    }

    let author = author_name.to_lowercase();
    for term in &parsed.terms {
        if author.contains(term) {
            score += AUTHOR_WEIGHT;
        }
    }

    if let Some(published_at) = article.published_at {
        let days_old = (now - published_at).num_days();
        if days_old <= 7 {
            score *= 1.2;
        } else if days_old <= 30 {
            score *= 1.1;
        }
    }

    if article.view_count > 0 {
        let popularity_boost = (article.view_count as f64 / 1000.0).min(0.5);
        score *= 1.0 + popularity_boost;
    }

    score
}

fn sort_results(matched: &mut [&Article], sort: SortOrder, scores: &HashMap<u64, f64>) {
    match sort {
        SortOrder::Relevance => {
            matched.sort_by(|a, b| {
                let sa = scores.get(&a.id).copied().unwrap_or(0.0);
                let sb = scores.get(&b.id).copied().unwrap_or(0.0);
                sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        SortOrder::DateDesc => {
            matched.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        }
        SortOrder::DateAsc => {
            matched.sort_by(|a, b| a.published_at.cmp(&b.published_at));
        }
        SortOrder::Alphabetical => {
            matched.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        }
        SortOrder::Popularity => {
            matched.sort_by(|a, b| {
                let pa = a.view_count + a.comment_count * 5;
                let pb = b.view_count + b.comment_count * 5;
                pb.cmp(&pa).then(b.published_at.cmp(&a.published_at))
            });
        }
    }
}

/// A typed autocomplete suggestion.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    Article { title: String, slug: String },
    Category { name: String, slug: String },
    Author { name: String, username: String },
    Popular { term: String },
}

/// Common news terms served when the partial query is too short to match.
const POPULAR_SEARCHES: &[&str] = &[
    "politics",
    "economy",
    "technology",
    "climate change",
    "international relations",
    "business",
    "science",
    "culture",
    "health",
    "education",
];

/// Autocomplete for a partial query.
///
/// Under two characters the popular-search list comes back instead of
/// matches. Articles take half the budget, categories and authors three
/// slots each.
pub fn suggestions(store: &Store, partial: &str, limit: usize) -> Vec<Suggestion> {
    let partial = partial.trim().to_lowercase();
    if partial.chars().count() < 2 {
        return POPULAR_SEARCHES
            .iter()
            .take(limit)
            .map(|term| Suggestion::Popular { term: term.to_string() })
            .collect();
    }

    let mut out = Vec::new();

    for article in store
        .articles
        .iter()
        .filter(|a| a.is_published() && a.title.to_lowercase().contains(&partial))
        .take(limit / 2)
    {
        out.push(Suggestion::Article {
            title: article.title.clone(),
            slug: article.slug.clone(),
        });
    }

    for category in store
        .categories
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&partial))
        .take(3)
    {
        out.push(Suggestion::Category {
            name: category.name.clone(),
            slug: category.slug.clone(),
        });
    }

    for author in store
        .users
        .iter()
        .filter(|u| {
            u.role >= crate::models::Role::Author
                && u.full_name().to_lowercase().contains(&partial)
        })
        .take(3)
    {
        out.push(Suggestion::Author {
            name: author.full_name(),
            username: author.username.clone(),
        });
    }

    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Role, User};

    fn seed_store() -> Store {
        let mut store = Store::empty("/tmp/unused");
        store
            .insert_user(User {
                id: 0,
                username: "jsmith".to_string(),
                email: "j@example.com".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Smith".to_string(),
                role: Role::Author,
                bio: None,
                is_active: true,
                created_at: Utc::now(),
            })
            .unwrap();
        store.insert_category(Category {
            id: 0,
            name: "Business".to_string(),
            slug: "business".to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        });

        let mut published = |title: &str, content: &str, tags: &[&str], days_old: i64| {
            let mut article = Article::draft(title, content, 1, 1);
            article.status = ArticleStatus::Published;
            article.published_at = Some(Utc::now() - Duration::days(days_old));
            article.tags = tags.iter().map(|t| t.to_string()).collect();
            store.insert_article(article)
        };

        published(
            "Grid storage reshapes the power market",
            "Battery storage sites arbitrage the evening peak. Storage, storage, storage.",
            &["energy", "storage"],
            2,
        );
        published(
            "Ports reopen after the storm",
            "Shipping resumes as the storm clears the coast.",
            &["shipping"],
            40,
        );
        published(
            "Quarterly earnings roundup",
            "Grid operators posted mixed storage earnings.",
            &["markets"],
            3,
        );
        store
    }

    #[test]
    fn test_parse_query_full_syntax() {
        let parsed =
            parse_query(r#"climate "sea level" -opinion category:business rising"#);
        assert_eq!(parsed.phrases, vec!["sea level"]);
        assert_eq!(parsed.excluded, vec!["opinion"]);
        assert_eq!(parsed.filters.get("category"), Some(&"business".to_string()));
        assert_eq!(parsed.terms, vec!["climate", "rising"]);
    }

    #[test]
    fn test_parse_query_drops_single_letters() {
        let parsed = parse_query("a climate x report");
        assert_eq!(parsed.terms, vec!["climate", "report"]);
    }

    #[test]
    fn test_search_requires_minimum_length() {
        let store = seed_store();
        assert!(search(&store, &SearchRequest::new("x"), Utc::now()).is_err());
    }

    #[test]
    fn test_terms_are_anded() {
        let store = seed_store();
        let page = search(&store, &SearchRequest::new("grid storage"), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 2);

        let page = search(&store, &SearchRequest::new("grid shipping"), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[test]
    fn test_exclusion_subtracts() {
        let store = seed_store();
        let page = search(&store, &SearchRequest::new("storage -earnings"), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 1);
        assert!(page.hits[0].article.title.contains("Grid storage"));
    }

    #[test]
    fn test_phrase_must_match_verbatim() {
        let store = seed_store();
        let page =
            search(&store, &SearchRequest::new(r#""evening peak""#), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 1);

        let page = search(&store, &SearchRequest::new(r#""peak evening""#), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[test]
    fn test_relevance_prefers_title_hits() {
        let store = seed_store();
        let page = search(&store, &SearchRequest::new("storage"), Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 2);
        // title + tag + capped content occurrences beat a single body mention
        assert!(page.hits[0].article.title.contains("Grid storage"));
        let top = page.hits[0].relevance.unwrap();
        let second = page.hits[1].relevance.unwrap();
        assert!(top > second);
    }

    #[test]
    fn test_content_occurrences_are_capped() {
        let mut article = Article::draft("T", &"storage ".repeat(40), 1, 1);
        article.status = ArticleStatus::Published;
        let parsed = parse_query("storage");
        let score = relevance_score(&article, "", &parsed, Utc::now());
        // no recency/popularity multipliers apply; capped at 5 occurrences
        assert!((score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_recency_multiplier() {
        let parsed = parse_query("storage");
        let now = Utc::now();

        let mut fresh = Article::draft("storage news", "storage", 1, 1);
        fresh.published_at = Some(now - Duration::days(1));
        let mut old = Article::draft("storage news", "storage", 1, 1);
        old.published_at = Some(now - Duration::days(90));

        let fresh_score = relevance_score(&fresh, "", &parsed, now);
        let old_score = relevance_score(&old, "", &parsed, now);
        assert!((fresh_score / old_score - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_date_range_filter() {
        let store = seed_store();
        let mut request = SearchRequest::new("storm");
        request.date_range = DateRange::Week;
        let page = search(&store, &request, Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 0);

        request.date_range = DateRange::All;
        let page = search(&store, &request, Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[test]
    fn test_inline_author_filter() {
        let store = seed_store();
        let page = search(
            &store,
            &SearchRequest::new("storage author:jsmith"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(page.pagination.total, 2);

        let page = search(
            &store,
            &SearchRequest::new("storage author:nobody"),
            Utc::now(),
        )
        .unwrap();
        // unresolvable username adds no filter; matching the old behavior of
        // ignoring unusable filters rather than failing the search
        assert_eq!(page.pagination.total, 2);
    }

    #[test]
    fn test_pagination_math() {
        let store = seed_store();
        let mut request = SearchRequest::new("the");
        request.per_page = 2;
        request.sort = SortOrder::DateDesc;
        let page = search(&store, &request, Utc::now()).unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.pages, 1);
        assert!(!page.pagination.has_next);
        assert!(!page.pagination.has_prev);
    }

    #[test]
    fn test_popularity_sort() {
        let mut store = seed_store();
        store.article_mut(2).unwrap().view_count = 10_000;
        let mut request = SearchRequest::new("the");
        request.sort = SortOrder::Popularity;
        let page = search(&store, &request, Utc::now()).unwrap();
        assert_eq!(page.hits[0].article.id, 2);
        assert!(page.hits[0].relevance.is_none());
    }

    #[test]
    fn test_suggestions() {
        let store = seed_store();
        let short = suggestions(&store, "s", 5);
        assert_eq!(short.len(), 5);
        assert!(matches!(short[0], Suggestion::Popular { .. }));

        let matched = suggestions(&store, "grid", 10);
        assert!(
            matched
                .iter()
                .any(|s| matches!(s, Suggestion::Article { title, .. } if title.contains("Grid")))
        );

        let authors = suggestions(&store, "jane", 10);
        assert!(matches!(authors[0], Suggestion::Author { .. }));

        let categories = suggestions(&store, "busi", 10);
        assert!(matches!(categories[0], Suggestion::Category { .. }));
    }
}
