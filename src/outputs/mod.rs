//! Publishing outputs: edition JSON, Markdown, and index files.
//!
//! A publish run gathers the day's published articles into an [`Edition`]
//! named for the time of day, then writes:
//!
//! ```text
//! json_output_dir/
//! └── 2026-08-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//!
//! markdown_output_dir/
//! ├── 2026-08-06.md           # date TOC
//! ├── 2026-08-06_evening.md   # full edition
//! └── published.md            # master index
//! ```

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::ArticleStatus;
use crate::store::Store;
use crate::utils::time_of_day;

pub mod indexes;
pub mod json;
pub mod markdown;

/// One published article as it appears in an edition export.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditionArticle {
    pub id: u64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub category: String,
    pub author: String,
    pub tags: Vec<String>,
    pub reading_time: u32,
    pub published_at: DateTime<Utc>,
    pub content: String,
}

/// All articles published on one day, assembled at one time of day.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Edition {
    /// The date of publication in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The time of day category: "morning", "afternoon", or "evening".
    pub time_of_day: String,
    /// The exact local time the edition was assembled.
    pub local_time: String,
    pub articles: Vec<EditionArticle>,
}

/// Gather today's published articles into an edition.
///
/// An article references its author and category by id; a dangling
/// reference gets a placeholder byline rather than sinking the export.
pub fn build_edition(store: &Store) -> Edition {
    let today = Local::now().date_naive();
    let articles = store
        .articles
        .iter()
        .filter(|a| a.status == ArticleStatus::Published)
        .filter(|a| {
            a.published_at
                .map(|at| at.with_timezone(&Local).date_naive() == today)
                .unwrap_or(false)
        })
        .map(|article| {
            let author = match store.user(article.author_id) {
                Ok(user) => user.full_name(),
                Err(_) => {
                    warn!(article_id = article.id, "Author missing; using staff byline");
                    "Staff".to_string()
                }
            };
            let category = store
                .category(article.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| "Uncategorized".to_string());
            EditionArticle {
                id: article.id,
                title: article.title.clone(),
                slug: article.slug.clone(),
                subtitle: article.subtitle.clone(),
                excerpt: article.excerpt.clone(),
                category,
                author,
                tags: article.tags.clone(),
                reading_time: article.reading_time,
                published_at: article.published_at.unwrap_or_else(Utc::now),
                content: article.content.clone(),
            }
        })
        .collect();

    Edition {
        local_date: today.to_string(),
        time_of_day: time_of_day(),
        local_time: Local::now().time().to_string(),
        articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Category, Role, User};

    #[test]
    fn test_build_edition_collects_todays_published() {
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
            name: "World".to_string(),
            slug: "world".to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        });

        let mut published_today = Article::draft("Today's Story", "body", 1, 1);
        published_today.status = ArticleStatus::Published;
        published_today.published_at = Some(Utc::now());
        store.insert_article(published_today);

        let mut published_last_week = Article::draft("Old Story", "body", 1, 1);
        published_last_week.status = ArticleStatus::Published;
        published_last_week.published_at = Some(Utc::now() - chrono::Duration::days(7));
        store.insert_article(published_last_week);

        store.insert_article(Article::draft("Still a Draft", "body", 1, 1));

        let edition = build_edition(&store);
        assert_eq!(edition.articles.len(), 1);
        let article = &edition.articles[0];
        assert_eq!(article.title, "Today's Story");
        assert_eq!(article.author, "Jane Smith");
        assert_eq!(article.category, "World");
    }

    #[test]
    fn test_missing_author_gets_staff_byline() {
        let mut store = Store::empty("/tmp/unused");
        let mut article = Article::draft("Orphan", "body", 99, 99);
        article.status = ArticleStatus::Published;
        article.published_at = Some(Utc::now());
        store.insert_article(article);

        let edition = build_edition(&store);
        assert_eq!(edition.articles[0].author, "Staff");
        assert_eq!(edition.articles[0].category, "Uncategorized");
    }
}
