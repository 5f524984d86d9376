//! JSON-collection content store.
//!
//! The newsroom keeps its state as pretty-printed JSON files under a data
//! directory, one file per collection:
//!
//! ```text
//! newsroom/
//! ├── articles.json
//! ├── users.json
//! ├── categories.json
//! ├── comments.json
//! ├── revisions.json
//! ├── workflow_steps.json
//! ├── workflow_entries.json
//! ├── seo.json
//! └── trends/            # timestamped trend reports
//! ```
//!
//! Collections load fully into memory; commands mutate the in-memory state
//! and call [`Store::save`] once at the end. Ids are allocated as max+1 and
//! slugs are made unique with a numeric suffix.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::models::{
    Article, ArticleRevision, ArticleStatus, Category, Comment, CommentStatus, User,
};
use crate::seo::SeoRecord;
use crate::utils::ensure_writable_dir;
use crate::workflow::{WorkflowEntry, WorkflowStep};

const ARTICLES: &str = "articles.json";
const USERS: &str = "users.json";
const CATEGORIES: &str = "categories.json";
const COMMENTS: &str = "comments.json";
const REVISIONS: &str = "revisions.json";
const WORKFLOW_STEPS: &str = "workflow_steps.json";
const WORKFLOW_ENTRIES: &str = "workflow_entries.json";
const SEO: &str = "seo.json";

/// The in-memory newsroom with its backing directory.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    pub articles: Vec<Article>,
    pub users: Vec<User>,
    pub categories: Vec<Category>,
    pub comments: Vec<Comment>,
    pub revisions: Vec<ArticleRevision>,
    pub workflow_steps: Vec<WorkflowStep>,
    pub workflow_entries: Vec<WorkflowEntry>,
    pub seo_records: Vec<SeoRecord>,
}

impl Store {
    /// Create the data directory and an empty store.
    ///
    /// Used by `init`; refuses nothing, so re-running `init` on an existing
    /// directory just reloads it.
    #[instrument(level = "info", skip_all, fields(root = %root))]
    pub async fn create(root: &str) -> Result<Store, Box<dyn Error>> {
        ensure_writable_dir(root).await?;
        Store::open(root).await
    }

    /// An empty store rooted at `root`, touching nothing on disk until
    /// [`Store::save`] is called.
    pub fn empty(root: impl Into<PathBuf>) -> Store {
        Store {
            root: root.into(),
            articles: Vec::new(),
            users: Vec::new(),
            categories: Vec::new(),
            comments: Vec::new(),
            revisions: Vec::new(),
            workflow_steps: Vec::new(),
            workflow_entries: Vec::new(),
            seo_records: Vec::new(),
        }
    }

    /// Open an existing data directory.
    ///
    /// Missing collection files read as empty; a missing directory is an
    /// error pointing at `init`.
    #[instrument(level = "info", skip_all, fields(root = %root))]
    pub async fn open(root: &str) -> Result<Store, Box<dyn Error>> {
        let root_path = PathBuf::from(root);
        if !root_path.is_dir() {
            return Err(format!(
                "data directory {root} does not exist; run `newsdesk init` first"
            )
            .into());
        }

        let mut store = Store::empty(&root_path);
        store.articles = load_collection(&root_path.join(ARTICLES)).await?;
        store.users = load_collection(&root_path.join(USERS)).await?;
        store.categories = load_collection(&root_path.join(CATEGORIES)).await?;
        store.comments = load_collection(&root_path.join(COMMENTS)).await?;
        store.revisions = load_collection(&root_path.join(REVISIONS)).await?;
        store.workflow_steps = load_collection(&root_path.join(WORKFLOW_STEPS)).await?;
        store.workflow_entries = load_collection(&root_path.join(WORKFLOW_ENTRIES)).await?;
        store.seo_records = load_collection(&root_path.join(SEO)).await?;
        info!(
            articles = store.articles.len(),
            users = store.users.len(),
            comments = store.comments.len(),
            "Opened content store"
        );
        Ok(store)
    }

    /// Persist every collection back to disk.
    #[instrument(level = "info", skip_all)]
    pub async fn save(&self) -> Result<(), Box<dyn Error>> {
        save_collection(&self.root.join(ARTICLES), &self.articles).await?;
        save_collection(&self.root.join(USERS), &self.users).await?;
        save_collection(&self.root.join(CATEGORIES), &self.categories).await?;
        save_collection(&self.root.join(COMMENTS), &self.comments).await?;
        save_collection(&self.root.join(REVISIONS), &self.revisions).await?;
        save_collection(&self.root.join(WORKFLOW_STEPS), &self.workflow_steps).await?;
        save_collection(&self.root.join(WORKFLOW_ENTRIES), &self.workflow_entries).await?;
        save_collection(&self.root.join(SEO), &self.seo_records).await?;
        debug!(root = %self.root.display(), "Store saved");
        Ok(())
    }

    /// Directory for timestamped trend reports.
    pub fn trends_dir(&self) -> PathBuf {
        self.root.join("trends")
    }

    // ---- articles ----

    /// Insert a draft, allocating its id and a unique slug.
    pub fn insert_article(&mut self, mut article: Article) -> u64 {
        article.id = next_id(self.articles.iter().map(|a| a.id));
        article.slug = unique_slug(&article.slug, self.articles.iter().map(|a| a.slug.as_str()));
        let id = article.id;
        info!(article_id = id, slug = %article.slug, "Inserted article");
        self.articles.push(article);
        id
    }

    pub fn article(&self, id: u64) -> Result<&Article, Box<dyn Error>> {
        self.articles
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| format!("article {id} not found").into())
    }

    pub fn article_mut(&mut self, id: u64) -> Result<&mut Article, Box<dyn Error>> {
        self.articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| format!("article {id} not found").into())
    }

    /// Apply an edit, snapshotting the previous state as a revision.
    ///
    /// Fields are applied only when provided; the read-time is recomputed
    /// when the body changes.
    pub fn update_article(
        &mut self,
        id: u64,
        edit: ArticleEdit,
        editor_id: u64,
    ) -> Result<(), Box<dyn Error>> {
        self.user(editor_id)?;
        let revision_number = self
            .revisions
            .iter()
            .filter(|r| r.article_id == id)
            .map(|r| r.revision_number)
            .max()
            .unwrap_or(0)
            + 1;
        let revision_id = next_id(self.revisions.iter().map(|r| r.id));

        let article = self.article_mut(id)?;
        let snapshot = ArticleRevision {
            id: revision_id,
            article_id: id,
            revision_number,
            title: article.title.clone(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone(),
            created_by: editor_id,
            created_at: Utc::now(),
            change_summary: edit.change_summary.clone(),
        };

        if let Some(title) = edit.title {
            article.title = title;
        }
        if let Some(content) = edit.content {
            article.reading_time = crate::utils::reading_time_minutes(&content);
            article.content = content;
        }
        if let Some(excerpt) = edit.excerpt {
            article.excerpt = Some(excerpt);
        }
        if let Some(subtitle) = edit.subtitle {
            article.subtitle = Some(subtitle);
        }
        if let Some(tags) = edit.tags {
            article.tags = tags;
        }
        if let Some(seo_description) = edit.seo_description {
            article.seo_description = Some(seo_description);
        }
        if let Some(seo_keywords) = edit.seo_keywords {
            article.seo_keywords = Some(seo_keywords);
        }
        if let Some(scheduled_at) = edit.scheduled_at {
            article.scheduled_at = Some(scheduled_at);
        }
        article.updated_at = Utc::now();

        self.revisions.push(snapshot);
        info!(article_id = id, revision = revision_number, "Updated article");
        Ok(())
    }

    /// Delete an article and everything hanging off it: comments, revisions,
    /// workflow entries, SEO analyses.
    pub fn delete_article(&mut self, id: u64) -> Result<(), Box<dyn Error>> {
        self.article(id)?;
        self.articles.retain(|a| a.id != id);
        let comments_before = self.comments.len();
        self.comments.retain(|c| c.article_id != id);
        self.revisions.retain(|r| r.article_id != id);
        self.workflow_entries.retain(|w| w.article_id != id);
        self.seo_records.retain(|s| s.article_id != id);
        info!(
            article_id = id,
            cascaded_comments = comments_before - self.comments.len(),
            "Deleted article"
        );
        Ok(())
    }

    pub fn record_view(&mut self, id: u64) -> Result<u64, Box<dyn Error>> {
        let article = self.article_mut(id)?;
        article.view_count += 1;
        Ok(article.view_count)
    }

    /// Articles currently in the given status.
    pub fn articles_with_status(&self, status: ArticleStatus) -> Vec<&Article> {
        self.articles.iter().filter(|a| a.status == status).collect()
    }

    // ---- users ----

    pub fn insert_user(&mut self, mut user: User) -> Result<u64, Box<dyn Error>> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(format!("username {} is taken", user.username).into());
        }
        user.id = next_id(self.users.iter().map(|u| u.id));
        let id = user.id;
        info!(user_id = id, username = %user.username, "Inserted user");
        self.users.push(user);
        Ok(id)
    }

    pub fn user(&self, id: u64) -> Result<&User, Box<dyn Error>> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| format!("user {id} not found").into())
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    // ---- categories ----

    pub fn insert_category(&mut self, mut category: Category) -> u64 {
        category.id = next_id(self.categories.iter().map(|c| c.id));
        category.slug = unique_slug(
            &category.slug,
            self.categories.iter().map(|c| c.slug.as_str()),
        );
        let id = category.id;
        self.categories.push(category);
        id
    }

    pub fn category(&self, id: u64) -> Result<&Category, Box<dyn Error>> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| format!("category {id} not found").into())
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    // ---- comments ----

    /// Insert a moderated comment and refresh the article's approved count.
    pub fn insert_comment(&mut self, mut comment: Comment) -> Result<u64, Box<dyn Error>> {
        let article_id = comment.article_id;
        self.article(article_id)?;
        comment.id = next_id(self.comments.iter().map(|c| c.id));
        let id = comment.id;
        self.comments.push(comment);
        self.recount_comments(article_id)?;
        info!(comment_id = id, article_id, "Inserted comment");
        Ok(id)
    }

    pub fn comment(&self, id: u64) -> Result<&Comment, Box<dyn Error>> {
        self.comments
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| format!("comment {id} not found").into())
    }

    pub fn comments_for_article(&self, article_id: u64) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .collect()
    }

    /// Set a comment's moderation status and refresh the article count.
    pub fn set_comment_status(
        &mut self,
        id: u64,
        status: CommentStatus,
    ) -> Result<(), Box<dyn Error>> {
        let article_id = {
            let comment = self
                .comments
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| format!("comment {id} not found"))?;
            comment.status = status;
            comment.article_id
        };
        self.recount_comments(article_id)?;
        Ok(())
    }

    /// `comment_count` tracks approved comments only.
    fn recount_comments(&mut self, article_id: u64) -> Result<(), Box<dyn Error>> {
        let approved = self
            .comments
            .iter()
            .filter(|c| c.article_id == article_id && c.status == CommentStatus::Approved)
            .count() as u64;
        let article = self.article_mut(article_id)?;
        article.comment_count = approved;
        Ok(())
    }

    // ---- seo ----

    /// Keep the latest analysis per article.
    pub fn upsert_seo_record(&mut self, record: SeoRecord) {
        self.seo_records.retain(|r| r.article_id != record.article_id);
        self.seo_records.push(record);
    }

    pub fn seo_record(&self, article_id: u64) -> Option<&SeoRecord> {
        self.seo_records.iter().find(|r| r.article_id == article_id)
    }
}

/// Field-wise article edit; `None` leaves the field alone.
#[derive(Debug, Default, Clone)]
pub struct ArticleEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub subtitle: Option<String>,
    pub tags: Option<Vec<String>>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub scheduled_at: Option<chrono::DateTime<Utc>>,
    pub change_summary: Option<String>,
}

async fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        warn!(path = %path.display(), "Collection file is empty; treating as no records");
        return Ok(Vec::new());
    }
    let records = serde_json::from_str(&raw)?;
    Ok(records)
}

async fn save_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).await?;
    Ok(())
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

/// Append `-2`, `-3`, ... until the slug is free.
fn unique_slug<'a>(base: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}
