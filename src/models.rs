//! Data models for the newsroom content store.
//!
//! This module defines the core records persisted by the [`crate::store`]:
//! - [`Article`]: the unit of publication, moving through [`ArticleStatus`]
//! - [`User`] and [`Role`]: newsroom staff and their editorial authority
//! - [`Category`]: the section an article files under
//! - [`Comment`] and [`CommentStatus`]: reader comments and their moderation state
//! - [`ArticleRevision`]: a snapshot taken on every article edit
//!
//! Status enums serialize as lowercase strings so the JSON collections read
//! the way the old platform's database rows did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{reading_time_minutes, slugify};

/// Editorial authority, lowest to highest.
///
/// The derived ordering is load-bearing: a workflow step that requires an
/// editor is satisfiable by an editor or an admin, so gates compare with
/// `actor.role >= step.required_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subscriber,
    Author,
    Editor,
    Admin,
}

impl Role {
    /// Parse a role name as it appears in CLI arguments and config files.
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "subscriber" => Some(Role::Subscriber),
            "author" => Some(Role::Author),
            "editor" => Some(Role::Editor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A newsroom user: staff writer, editor, or registered reader.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name used in bylines and search matching.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A section of the publication (World Affairs, Business, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Where an article sits in its lifecycle.
///
/// `Scheduled` is reached when the final workflow step completes while a
/// future `scheduled_at` is set; the publish sweep releases it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Scheduled,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn parse(s: &str) -> Option<ArticleStatus> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ArticleStatus::Draft),
            "scheduled" => Some(ArticleStatus::Scheduled),
            "published" => Some(ArticleStatus::Published),
            "archived" => Some(ArticleStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Scheduled => "scheduled",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

/// An article in the content store.
///
/// Counter fields (`view_count`, `comment_count`, ...) are maintained by the
/// store, not by callers. `reading_time` is recomputed whenever the content
/// changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    pub status: ArticleStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub seo_keywords: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub reading_time: u32,
    pub author_id: u64,
    pub category_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Build a fresh draft. The slug comes from the title; the store makes
    /// it unique before inserting.
    pub fn draft(title: &str, content: &str, author_id: u64, category_id: u64) -> Article {
        let now = Utc::now();
        Article {
            id: 0,
            title: title.to_string(),
            slug: slugify(title),
            subtitle: None,
            excerpt: None,
            content: content.to_string(),
            status: ArticleStatus::Draft,
            tags: Vec::new(),
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            reading_time: reading_time_minutes(content),
            author_id,
            category_id,
            created_at: now,
            updated_at: now,
            published_at: None,
            scheduled_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    /// The seo keyword list, comma-split and lowercased.
    pub fn keyword_list(&self) -> Vec<String> {
        self.seo_keywords
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Moderation state of a reader comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Spam,
    Rejected,
}

impl CommentStatus {
    pub fn parse(s: &str) -> Option<CommentStatus> {
        match s.to_lowercase().as_str() {
            "pending" => Some(CommentStatus::Pending),
            "approved" => Some(CommentStatus::Approved),
            "spam" => Some(CommentStatus::Spam),
            "rejected" => Some(CommentStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Spam => "spam",
            CommentStatus::Rejected => "rejected",
        }
    }
}

/// A reader comment, possibly a reply to another comment on the same article.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Comment {
    pub id: u64,
    pub article_id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub author_id: Option<u64>,
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub author_website: Option<String>,
    pub content: String,
    pub status: CommentStatus,
    pub spam_score: u32,
    pub like_count: u64,
    pub report_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A snapshot of an article taken before an edit is applied.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleRevision {
    pub id: u64,
    pub article_id: u64,
    pub revision_number: u32,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub change_summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::Editor);
        assert!(Role::Editor > Role::Author);
        assert!(Role::Author > Role::Subscriber);
        assert!(Role::Admin >= Role::Admin);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Editor"), Some(Role::Editor));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("nobody"), None);
    }

    #[test]
    fn test_draft_construction() {
        let article = Article::draft("Markets Rally on Trade News", "body text", 1, 2);
        assert_eq!(article.slug, "markets-rally-on-trade-news");
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.reading_time, 1);
        assert_eq!(article.author_id, 1);
        assert_eq!(article.category_id, 2);
        assert!(article.published_at.is_none());
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["draft", "scheduled", "published", "archived"] {
            let status = ArticleStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert_eq!(ArticleStatus::parse("gone"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ArticleStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
        let back: ArticleStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(back, ArticleStatus::Draft);
    }

    #[test]
    fn test_keyword_list() {
        let mut article = Article::draft("T", "c", 1, 1);
        article.seo_keywords = Some("Trade, tariffs , ,Economy".to_string());
        assert_eq!(article.keyword_list(), vec!["trade", "tariffs", "economy"]);
        article.seo_keywords = None;
        assert!(article.keyword_list().is_empty());
    }

    #[test]
    fn test_full_name_trims() {
        let user = User {
            id: 1,
            username: "jsmith".to_string(),
            email: "j@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            role: Role::Author,
            bio: None,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "Jane Smith");
    }
}
