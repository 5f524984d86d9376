//! Command-line interface definitions for the news desk.
//!
//! Arguments are defined with `clap` derive. Credentials never appear here;
//! they come from `config.yaml` or the environment (see [`crate::config`]).

use clap::{Parser, Subcommand};

/// Editorial backend for a news publication.
///
/// # Examples
///
/// ```sh
/// # First run: create the newsroom and its defaults
/// newsdesk init
///
/// # Watch the wire and draft from what's trending
/// newsdesk trends -k economy -k climate
/// newsdesk generate --auto --max-articles 3
///
/// # Move an article through the desk and publish the day
/// newsdesk workflow complete 7 --actor editor
/// newsdesk publish
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config.yaml file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Override the data directory from config
    #[arg(long, env = "NEWSDESK_DATA_DIR")]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and seed workflow steps, categories, and staff
    Init,

    /// Article CRUD and view tracking
    Article {
        #[command(subcommand)]
        action: ArticleAction,
    },

    /// Newsroom users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Publication sections
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Reader comments and moderation
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Editorial workflow operations
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Run and store an SEO analysis for an article
    Seo {
        /// Article id
        article_id: u64,
    },

    /// Monitor external sources for trending topics
    Trends {
        /// Keyword to monitor (repeatable; defaults from config)
        #[arg(short, long = "keyword")]
        keyword: Vec<String>,

        /// Observation window in hours
        #[arg(long)]
        hours_back: Option<i64>,
    },

    /// Draft articles with an LLM
    Generate {
        /// Topic to draft; omit with --auto to draft from trends
        #[arg(long)]
        topic: Option<String>,

        /// Draft from the current trend report instead of a single topic
        #[arg(long)]
        auto: bool,

        /// Ceiling for --auto drafting
        #[arg(long)]
        max_articles: Option<usize>,

        /// LLM provider: openai, claude, or deepseek
        #[arg(long)]
        provider: Option<String>,

        /// Article register: news, analysis, or opinion
        #[arg(long)]
        article_type: Option<String>,

        /// Category slug for the stored drafts
        #[arg(long)]
        category: Option<String>,

        /// Keyword to weave in (repeatable)
        #[arg(short, long = "keyword")]
        keyword: Vec<String>,

        /// Target word count
        #[arg(long)]
        target_length: Option<u32>,

        /// Username credited as the draft's author
        #[arg(long, default_value = "newsbot")]
        author: String,
    },

    /// Search published articles
    Search {
        /// Query; supports "quoted phrases", -exclusions, and key:value filters
        query: String,

        /// relevance, date_desc, date_asc, popularity, or alphabetical
        #[arg(long, default_value = "relevance")]
        sort: String,

        /// all, today, week, month, 3months, 6months, or year
        #[arg(long, default_value = "all")]
        date_range: String,

        /// Category slug filter (repeatable)
        #[arg(long = "category")]
        category: Vec<String>,

        /// Author username filter (repeatable)
        #[arg(long = "author")]
        author: Vec<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },

    /// Autocomplete suggestions for a partial query
    Suggest {
        partial: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Release due scheduled articles and export today's edition
    Publish {
        /// Output directory for the JSON API files
        #[arg(short, long, default_value = "./site/json")]
        json_output_dir: String,

        /// Output directory for the Markdown files
        #[arg(short, long, default_value = "./site/markdown")]
        markdown_output_dir: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArticleAction {
    /// Create a draft
    Create {
        #[arg(long)]
        title: String,

        /// Body text inline
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Body text from a file
        #[arg(long)]
        content_file: Option<String>,

        /// Author username
        #[arg(long)]
        author: String,

        /// Category slug
        #[arg(long)]
        category: String,

        #[arg(long)]
        excerpt: Option<String>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Hold publication until this RFC 3339 time
        #[arg(long)]
        schedule_at: Option<String>,

        /// Start the editorial workflow immediately
        #[arg(long)]
        start_workflow: bool,
    },

    /// List articles, optionally by status
    List {
        /// draft, scheduled, published, or archived
        #[arg(long)]
        status: Option<String>,
    },

    /// Print one article in full
    Show { id: u64 },

    /// Edit fields, recording a revision
    Update {
        id: u64,

        /// Editor username
        #[arg(long)]
        editor: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        #[arg(long)]
        content_file: Option<String>,

        #[arg(long)]
        excerpt: Option<String>,

        #[arg(long)]
        subtitle: Option<String>,

        /// Comma-separated tags (replaces the list)
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        seo_description: Option<String>,

        /// Comma-separated SEO keywords
        #[arg(long)]
        seo_keywords: Option<String>,

        #[arg(long)]
        schedule_at: Option<String>,

        /// One-line summary recorded with the revision
        #[arg(long)]
        summary: Option<String>,
    },

    /// Delete an article and everything attached to it
    Delete { id: u64 },

    /// Record a reader view
    View { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    Add {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// subscriber, author, editor, or admin
        #[arg(long, default_value = "author")]
        role: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum CommentAction {
    /// Submit a reader comment (validated and spam-scored)
    Add {
        /// Article id
        #[arg(long)]
        article: u64,

        #[arg(long)]
        content: String,

        #[arg(long, default_value = "Anonymous")]
        name: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        website: Option<String>,

        /// Parent comment id when replying
        #[arg(long)]
        parent: Option<u64>,
    },

    /// Threaded listing for an article
    List {
        /// Article id
        article: u64,

        /// Include pending/spam/rejected comments
        #[arg(long)]
        all: bool,
    },

    /// Set moderation status on one or more comments
    Moderate {
        /// approved, rejected, or spam
        #[arg(long)]
        status: String,

        /// Comment ids
        ids: Vec<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkflowAction {
    /// Start the editorial workflow for a draft
    Start {
        /// Article id
        article: u64,
    },

    /// Show an article's workflow history
    Show {
        /// Article id
        article: u64,
    },

    /// Complete the article's open step
    Complete {
        /// Article id
        article: u64,

        /// Acting username
        #[arg(long)]
        actor: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Reject the open step, returning the article to draft
    Reject {
        /// Article id
        article: u64,

        /// Acting username
        #[arg(long)]
        actor: String,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_defaults() {
        let cli = Cli::parse_from(["newsdesk", "search", "grid storage"]);
        match cli.command {
            Command::Search { query, sort, date_range, page, per_page, .. } => {
                assert_eq!(query, "grid storage");
                assert_eq!(sort, "relevance");
                assert_eq!(date_range, "all");
                assert_eq!(page, 1);
                assert_eq!(per_page, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_trends_repeatable_keywords() {
        let cli = Cli::parse_from(["newsdesk", "trends", "-k", "economy", "-k", "climate"]);
        match cli.command {
            Command::Trends { keyword, hours_back } => {
                assert_eq!(keyword, vec!["economy", "climate"]);
                assert!(hours_back.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_generate_auto_flags() {
        let cli = Cli::parse_from([
            "newsdesk",
            "generate",
            "--auto",
            "--max-articles",
            "3",
            "--provider",
            "deepseek",
        ]);
        match cli.command {
            Command::Generate { auto, max_articles, provider, topic, .. } => {
                assert!(auto);
                assert_eq!(max_articles, Some(3));
                assert_eq!(provider.as_deref(), Some("deepseek"));
                assert!(topic.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_workflow_complete_args() {
        let cli = Cli::parse_from([
            "newsdesk", "workflow", "complete", "7", "--actor", "editor", "--notes", "ship it",
        ]);
        match cli.command {
            Command::Workflow {
                action: WorkflowAction::Complete { article, actor, notes },
            } => {
                assert_eq!(article, 7);
                assert_eq!(actor, "editor");
                assert_eq!(notes.as_deref(), Some("ship it"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_default_path() {
        let cli = Cli::parse_from(["newsdesk", "init"]);
        assert_eq!(cli.config, "config.yaml");
    }
}
