//! # Newsdesk
//!
//! The editorial backend of a news publication, run from the command line:
//! a content store of articles, users, categories, and comments; an
//! editorial workflow; comment moderation with spam scoring; SEO analysis;
//! trend monitoring across RSS, Reddit, and scraped front pages; LLM-backed
//! article drafting; search; and date/edition publishing outputs.
//!
//! ## Features
//!
//! - CRUD over the newsroom collections, persisted as JSON under a data dir
//! - A draft → review → approval → publication workflow with role gates
//! - Comment intake with validation, fixed-weight spam heuristics, and
//!   threaded moderation
//! - Trend monitoring with near-duplicate grouping and newsworthiness scoring
//! - Article drafting through OpenAI-compatible and Anthropic LLM APIs, one
//!   topic at a time or straight from the trend report
//! - Weighted-relevance search with phrase, exclusion, and filter syntax
//! - Edition exports: JSON API files, Markdown documents, and index files
//!
//! ## Usage
//!
//! ```sh
//! newsdesk init
//! newsdesk generate --auto --max-articles 3
//! newsdesk publish
//! ```
//!
//! ## Architecture
//!
//! Commands follow a load → act → save shape: open the store, apply the
//! operation in memory, persist every collection once at the end. Batch
//! operations (trend sources, auto drafting) process items concurrently and
//! log-and-skip per-item failures rather than aborting the run.

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod generator;
mod models;
mod moderation;
mod outputs;
mod search;
mod seo;
mod store;
mod trends;
mod utils;
mod workflow;

use api::{ChatClient, Provider};
use cli::{ArticleAction, CategoryAction, Cli, Command, CommentAction, UserAction, WorkflowAction};
use config::DeskConfig;
use generator::{ArticleType, GenerationRequest};
use models::{Article, ArticleStatus, Category, CommentStatus, Role, User};
use store::{ArticleEdit, Store};
use utils::{ensure_writable_dir, slugify, upcase};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(config = %args.config, "Parsed CLI arguments");

    let mut config = config::load_config(&args.config).await?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let start_time = std::time::Instant::now();
    let result = run(args.command, &config).await;
    let elapsed = start_time.elapsed();

    match &result {
        Ok(()) => info!(?elapsed, "Command complete"),
        Err(e) => error!(?elapsed, error = %e, "Command failed"),
    }
    result
}

async fn run(command: Command, config: &DeskConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Init => cmd_init(config).await,
        Command::Article { action } => cmd_article(config, action).await,
        Command::User { action } => cmd_user(config, action).await,
        Command::Category { action } => cmd_category(config, action).await,
        Command::Comment { action } => cmd_comment(config, action).await,
        Command::Workflow { action } => cmd_workflow(config, action).await,
        Command::Seo { article_id } => cmd_seo(config, article_id).await,
        Command::Trends { keyword, hours_back } => cmd_trends(config, keyword, hours_back).await,
        Command::Generate {
            topic,
            auto,
            max_articles,
            provider,
            article_type,
            category,
            keyword,
            target_length,
            author,
        } => {
            cmd_generate(
                config,
                GenerateArgs {
                    topic,
                    auto,
                    max_articles,
                    provider,
                    article_type,
                    category,
                    keywords: keyword,
                    target_length,
                    author,
                },
            )
            .await
        }
        Command::Search {
            query,
            sort,
            date_range,
            category,
            author,
            page,
            per_page,
        } => cmd_search(config, query, sort, date_range, category, author, page, per_page).await,
        Command::Suggest { partial, limit } => cmd_suggest(config, partial, limit).await,
        Command::Publish {
            json_output_dir,
            markdown_output_dir,
        } => cmd_publish(config, json_output_dir, markdown_output_dir).await,
    }
}

// ---- init ----

async fn cmd_init(config: &DeskConfig) -> Result<(), Box<dyn Error>> {
    let mut store = Store::create(&config.data_dir).await?;

    workflow::seed_default_steps(&mut store);

    if store.categories.is_empty() {
        for (name, description) in [
            ("World Affairs", "International news and diplomacy"),
            ("Business", "Markets, trade, and the economy"),
            ("Technology", "Computing, platforms, and research"),
            ("Culture", "Arts, media, and society"),
            ("Science", "Discoveries and the scientific process"),
        ] {
            store.insert_category(Category {
                id: 0,
                name: name.to_string(),
                slug: slugify(name),
                description: Some(description.to_string()),
                is_active: true,
                created_at: Utc::now(),
            });
        }
        info!(count = store.categories.len(), "Seeded default categories");
    }

    if store.users.is_empty() {
        for (username, first, last, role) in [
            ("admin", "Site", "Admin", Role::Admin),
            ("newsbot", "News", "Bot", Role::Author),
        ] {
            store.insert_user(User {
                id: 0,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: first.to_string(),
                last_name: last.to_string(),
                role,
                bio: None,
                is_active: true,
                created_at: Utc::now(),
            })?;
        }
        info!(count = store.users.len(), "Seeded default users");
    }

    store.save().await?;
    println!(
        "Initialized newsroom at {} ({} workflow steps, {} categories, {} users)",
        config.data_dir,
        store.workflow_steps.len(),
        store.categories.len(),
        store.users.len()
    );
    Ok(())
}

// ---- articles ----

async fn cmd_article(config: &DeskConfig, action: ArticleAction) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;

    match action {
        ArticleAction::Create {
            title,
            content,
            content_file,
            author,
            category,
            excerpt,
            tags,
            schedule_at,
            start_workflow,
        } => {
            let content = match (content, content_file) {
                (Some(content), _) => content,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
                (None, None) => return Err("provide --content or --content-file".into()),
            };
            let author_id = resolve_user(&store, &author)?;
            let category_id = resolve_category(&store, &category)?;

            let mut article = Article::draft(&title, &content, author_id, category_id);
            article.excerpt = excerpt;
            if let Some(tags) = tags {
                article.tags = split_list(&tags);
            }
            if let Some(schedule_at) = schedule_at {
                article.scheduled_at = Some(parse_time(&schedule_at)?);
            }

            let id = store.insert_article(article);
            if start_workflow {
                workflow::start(&mut store, id)?;
            }
            store.save().await?;
            let article = store.article(id)?;
            println!("Created article {id} ({})", article.slug);
        }
        ArticleAction::List { status } => {
            let mut articles: Vec<&Article> = match status {
                Some(s) => {
                    let status = ArticleStatus::parse(&s).ok_or(format!("unknown status {s:?}"))?;
                    store.articles_with_status(status)
                }
                None => store.articles.iter().collect(),
            };
            articles.sort_by_key(|a| a.id);
            for article in articles {
                println!(
                    "{:>4}  {:<10}  {}  [{}]",
                    article.id,
                    article.status.as_str(),
                    article.title,
                    article.slug
                );
            }
        }
        ArticleAction::Show { id } => {
            let article = store.article(id)?;
            let author = store
                .user(article.author_id)
                .map(|u| u.full_name())
                .unwrap_or_else(|_| "unknown".to_string());
            let category = store
                .category(article.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| "unknown".to_string());
            println!("# {} ({})", article.title, article.status.as_str());
            if let Some(subtitle) = &article.subtitle {
                println!("{subtitle}");
            }
            println!(
                "By {author} in {category} · {} min read · {} views · {} comments",
                article.reading_time, article.view_count, article.comment_count
            );
            if let Some(excerpt) = &article.excerpt {
                println!("\n{excerpt}");
            }
            println!("\n{}", article.content);
            if !article.tags.is_empty() {
                println!("\nTags: {}", article.tags.join(", "));
            }
        }
        ArticleAction::Update {
            id,
            editor,
            title,
            content,
            content_file,
            excerpt,
            subtitle,
            tags,
            seo_description,
            seo_keywords,
            schedule_at,
            summary,
        } => {
            let editor_id = resolve_user(&store, &editor)?;
            let content = match (content, content_file) {
                (Some(content), _) => Some(content),
                (None, Some(path)) => Some(tokio::fs::read_to_string(&path).await?),
                (None, None) => None,
            };
            let edit = ArticleEdit {
                title,
                content,
                excerpt,
                subtitle,
                tags: tags.as_deref().map(split_list),
                seo_description,
                seo_keywords,
                scheduled_at: match schedule_at {
                    Some(s) => Some(parse_time(&s)?),
                    None => None,
                },
                change_summary: summary,
            };
            store.update_article(id, edit, editor_id)?;
            store.save().await?;
            println!("Updated article {id}");
        }
        ArticleAction::Delete { id } => {
            store.delete_article(id)?;
            store.save().await?;
            println!("Deleted article {id}");
        }
        ArticleAction::View { id } => {
            let views = store.record_view(id)?;
            store.save().await?;
            println!("Article {id} now at {views} views");
        }
    }
    Ok(())
}

// ---- users and categories ----

async fn cmd_user(config: &DeskConfig, action: UserAction) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;
    match action {
        UserAction::Add {
            username,
            email,
            first_name,
            last_name,
            role,
        } => {
            let role = Role::parse(&role).ok_or(format!("unknown role {role:?}"))?;
            let id = store.insert_user(User {
                id: 0,
                username: username.clone(),
                email,
                first_name,
                last_name,
                role,
                bio: None,
                is_active: true,
                created_at: Utc::now(),
            })?;
            store.save().await?;
            println!("Created user {id} ({username})");
        }
        UserAction::List => {
            for user in &store.users {
                println!(
                    "{:>4}  {:<10}  {:<20}  {}",
                    user.id,
                    format!("{:?}", user.role).to_lowercase(),
                    user.username,
                    user.full_name()
                );
            }
        }
    }
    Ok(())
}

async fn cmd_category(config: &DeskConfig, action: CategoryAction) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;
    match action {
        CategoryAction::Add { name, description } => {
            let id = store.insert_category(Category {
                id: 0,
                slug: slugify(&name),
                name: name.clone(),
                description,
                is_active: true,
                created_at: Utc::now(),
            });
            store.save().await?;
            println!("Created category {id} ({name})");
        }
        CategoryAction::List => {
            for category in &store.categories {
                let count = store
                    .articles
                    .iter()
                    .filter(|a| a.category_id == category.id)
                    .count();
                println!(
                    "{:>4}  {:<24}  {:<24}  {count} articles",
                    category.id, category.name, category.slug
                );
            }
        }
    }
    Ok(())
}

// ---- comments ----

async fn cmd_comment(config: &DeskConfig, action: CommentAction) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;
    match action {
        CommentAction::Add {
            article,
            content,
            name,
            email,
            website,
            parent,
        } => {
            store.article(article)?;

            let errors = moderation::validate(
                &content,
                Some(&name),
                email.as_deref(),
                website.as_deref(),
            );
            if !errors.is_empty() {
                return Err(errors.join("; ").into());
            }

            if let Some(parent_id) = parent {
                let parent_comment = store.comment(parent_id)?;
                if parent_comment.article_id != article {
                    return Err("parent comment belongs to a different article".into());
                }
                let parent_depth = moderation::depth(
                    &store.comments,
                    parent_comment,
                    config.comments.max_depth,
                );
                if parent_depth >= config.comments.max_depth {
                    return Err("maximum reply depth reached".into());
                }
            }

            let verdict = moderation::detect_spam(&content, email.as_deref());
            let status = moderation::intake_status(&verdict, config.comments.auto_approve);
            if !verdict.reasons.is_empty() {
                warn!(score = verdict.score, reasons = ?verdict.reasons, "Comment flagged");
            }

            let id = store.insert_comment(models::Comment {
                id: 0,
                article_id: article,
                parent_id: parent,
                author_id: None,
                author_name: name,
                author_email: email,
                author_website: website,
                content,
                status,
                spam_score: verdict.score,
                like_count: 0,
                report_count: 0,
                created_at: Utc::now(),
            })?;
            store.save().await?;
            println!(
                "Comment {id} recorded as {} (spam score {})",
                status.as_str(),
                verdict.score
            );
        }
        CommentAction::List { article, all } => {
            store.article(article)?;
            let comments: Vec<&models::Comment> = store
                .comments_for_article(article)
                .into_iter()
                .filter(|c| all || c.status == CommentStatus::Approved)
                .collect();
            let tree = moderation::build_tree(&comments);
            print_comment_tree(&tree, 0);
            println!("{} comment(s)", comments.len());
        }
        CommentAction::Moderate { status, ids } => {
            let status =
                CommentStatus::parse(&status).ok_or(format!("unknown status {status:?}"))?;
            let mut updated = 0;
            for id in ids {
                match store.set_comment_status(id, status) {
                    Ok(()) => {
                        updated += 1;
                        println!("Comment {id} -> {}", status.as_str());
                    }
                    Err(e) => warn!(comment_id = id, error = %e, "Skipping comment"),
                }
            }
            store.save().await?;
            println!("Moderated {updated} comment(s)");
        }
    }
    Ok(())
}

fn print_comment_tree(threads: &[moderation::CommentThread<'_>], depth: usize) {
    for thread in threads {
        let comment = thread.comment;
        println!(
            "{}#{} [{}] {}: {}",
            "  ".repeat(depth),
            comment.id,
            comment.status.as_str(),
            comment.author_name,
            comment.content
        );
        print_comment_tree(&thread.replies, depth + 1);
    }
}

// ---- workflow ----

async fn cmd_workflow(config: &DeskConfig, action: WorkflowAction) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;
    match action {
        WorkflowAction::Start { article } => {
            workflow::start(&mut store, article)?;
            store.save().await?;
            print_workflow(&store, article)?;
        }
        WorkflowAction::Show { article } => {
            print_workflow(&store, article)?;
        }
        WorkflowAction::Complete { article, actor, notes } => {
            let actor_id = resolve_user(&store, &actor)?;
            workflow::complete(&mut store, article, actor_id, notes)?;
            store.save().await?;
            print_workflow(&store, article)?;
        }
        WorkflowAction::Reject { article, actor, notes } => {
            let actor_id = resolve_user(&store, &actor)?;
            workflow::reject(&mut store, article, actor_id, notes)?;
            store.save().await?;
            print_workflow(&store, article)?;
        }
    }
    Ok(())
}

fn print_workflow(store: &Store, article_id: u64) -> Result<(), Box<dyn Error>> {
    let article = store.article(article_id)?;
    println!(
        "Article {}: {} ({})",
        article.id,
        article.title,
        article.status.as_str()
    );
    for entry in workflow::history(store, article_id) {
        let step = store
            .workflow_steps
            .iter()
            .find(|s| s.id == entry.step_id)
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        let completed = entry
            .completed_at
            .map(|at| at.format(" @ %Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let notes = entry
            .notes
            .as_deref()
            .map(|n| format!(" — {n}"))
            .unwrap_or_default();
        println!("  {:<18} {:?}{}{}", step, entry.status, completed, notes);
    }
    Ok(())
}

// ---- seo ----

async fn cmd_seo(config: &DeskConfig, article_id: u64) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;
    let article = store.article(article_id)?.clone();
    if let Some(previous) = store.seo_record(article_id) {
        println!(
            "Previous analysis: {}/100 on {}",
            previous.report.seo_score,
            previous.analyzed_at.format("%Y-%m-%d %H:%M")
        );
    }
    let report = seo::analyze(&article);

    println!("SEO score: {}/100", report.seo_score);
    println!("Readability: {:.1}", report.readability);
    println!(
        "Title: {} chars ({})",
        report.meta.title_length,
        if report.meta.title_optimal { "ok" } else { "adjust" }
    );
    println!(
        "Meta description: {} chars ({})",
        report.meta.meta_description_length,
        if report.meta.meta_description_optimal { "ok" } else { "adjust" }
    );
    if !report.keyword_density.is_empty() {
        println!("Top words:");
        for kd in report.keyword_density.iter().take(5) {
            println!("  {:<16} {:.2}%", kd.word, kd.percent);
        }
    }
    for suggestion in &report.suggestions {
        println!("- {suggestion}");
    }

    store.upsert_seo_record(seo::SeoRecord {
        article_id,
        report,
        analyzed_at: Utc::now(),
    });
    store.save().await?;
    Ok(())
}

// ---- trends ----

async fn cmd_trends(
    config: &DeskConfig,
    keywords: Vec<String>,
    hours_back: Option<i64>,
) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.data_dir).await?;
    let keywords = if keywords.is_empty() {
        config.trends.keywords.clone()
    } else {
        keywords
    };
    let hours_back = hours_back.unwrap_or(config.trends.hours_back);

    let observations = trends::monitor(&config.trends, &keywords, hours_back).await;
    let entries = trends::analyze::analyze(&observations, Utc::now());

    let report = trends::analyze::TrendReport {
        generated_at: Utc::now(),
        keywords: keywords.clone(),
        hours_back,
        entries,
    };

    let trends_dir = store.trends_dir();
    ensure_writable_dir(trends_dir.to_str().ok_or("bad trends dir path")?).await?;
    let report_path = trends_dir.join(format!(
        "{}_{}.json",
        Local::now().date_naive(),
        Local::now().format("%H%M%S")
    ));
    tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?).await?;
    info!(path = %report_path.display(), "Wrote trend report");

    if report.entries.is_empty() {
        println!("No trending topics matched {keywords:?} in the last {hours_back}h");
        return Ok(());
    }

    println!("Top trends (last {hours_back}h):");
    for entry in report.entries.iter().take(10) {
        let relevance = trends::analyze::keyword_relevance(&entry.topic, &keywords);
        println!(
            "{:>8.1}  {}  [{} source(s), {} mention(s), velocity {:.2}/h, {}/{} keyword(s)]",
            entry.trend_score,
            entry.topic,
            entry.sources.len(),
            entry.mention_count,
            entry.velocity,
            relevance.matched_keywords.len(),
            keywords.len()
        );
    }

    let topics: Vec<String> = report.entries.iter().map(|e| e.topic.clone()).collect();
    let rising = trends::analyze::trending_keywords(&topics, 3);
    if !rising.is_empty() {
        let preview: Vec<String> = rising
            .iter()
            .take(5)
            .map(|(word, count)| format!("{word} ({count})"))
            .collect();
        println!("Rising words: {}", preview.join(", "));
    }
    Ok(())
}

// ---- generation ----

struct GenerateArgs {
    topic: Option<String>,
    auto: bool,
    max_articles: Option<usize>,
    provider: Option<String>,
    article_type: Option<String>,
    category: Option<String>,
    keywords: Vec<String>,
    target_length: Option<u32>,
    author: String,
}

async fn cmd_generate(config: &DeskConfig, args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;

    let author_id = resolve_user(&store, &args.author)?;
    let provider_name = args
        .provider
        .clone()
        .unwrap_or_else(|| config.generation.provider.clone());
    let article_type = match &args.article_type {
        Some(s) => ArticleType::parse(s).ok_or(format!("unknown article type {s:?}"))?,
        None => ArticleType::parse(&config.generation.article_type).unwrap_or(ArticleType::News),
    };
    let target_length = args.target_length.unwrap_or(config.generation.target_length);

    let category_id = match &args.category {
        Some(slug) => resolve_category(&store, slug)?,
        None => store
            .categories
            .first()
            .map(|c| c.id)
            .ok_or("no categories exist; run `newsdesk init`")?,
    };
    let category_name = store.category(category_id)?.name.clone();

    let client = build_client(config, &provider_name, article_type)?;
    info!(
        provider = %provider_name,
        model = client.model(),
        "Drafting with estimated cost ${:.4} per article",
        generator::estimate_cost(target_length, client.provider())
    );

    if args.auto {
        return auto_generate(
            config,
            &mut store,
            &client,
            AutoParams {
                author_id,
                category_id,
                category_name,
                article_type,
                target_length,
                max_articles: args.max_articles.unwrap_or(config.generation.max_auto_articles),
                keywords: if args.keywords.is_empty() {
                    config.trends.keywords.clone()
                } else {
                    args.keywords
                },
            },
        )
        .await;
    }

    let topic = args.topic.ok_or("provide --topic, or --auto to draft from trends")?;
    let request = GenerationRequest {
        topic,
        category: category_name,
        article_type,
        keywords: args.keywords,
        target_length,
    };
    let generated = generator::generate(&client, &request).await?;
    let id = store_generated_draft(&mut store, &generated, &request, author_id, category_id)?;
    store.save().await?;
    println!(
        "Drafted article {id}: {} ({} tokens, ${:.4})",
        generated.article.title, generated.tokens_used, generated.cost
    );
    Ok(())
}

struct AutoParams {
    author_id: u64,
    category_id: u64,
    category_name: String,
    article_type: ArticleType,
    target_length: u32,
    max_articles: usize,
    keywords: Vec<String>,
}

/// Trend-driven drafting: monitor, rank, draft the top topics in parallel,
/// store what survived.
async fn auto_generate(
    config: &DeskConfig,
    store: &mut Store,
    client: &ChatClient,
    params: AutoParams,
) -> Result<(), Box<dyn Error>> {
    use futures::stream::{self, StreamExt};

    let observations =
        trends::monitor(&config.trends, &params.keywords, config.trends.hours_back).await;
    let entries = trends::analyze::analyze(&observations, Utc::now());
    if entries.is_empty() {
        println!("No trending topics to draft from");
        return Ok(());
    }

    let picked: Vec<_> = entries.into_iter().take(params.max_articles).collect();
    info!(
        count = picked.len(),
        parallel = config.generation.parallel_generation,
        "Drafting from trend report"
    );

    let requests: Vec<GenerationRequest> = picked
        .iter()
        .map(|entry| GenerationRequest {
            topic: entry.topic.clone(),
            category: params.category_name.clone(),
            article_type: if params.article_type == ArticleType::News {
                generator::determine_article_type(&entry.topic)
            } else {
                params.article_type
            },
            keywords: entry.matched_keywords.clone(),
            target_length: params.target_length,
        })
        .collect();

    let results: Vec<(GenerationRequest, Result<generator::Generated, _>)> =
        stream::iter(requests.into_iter())
            .map(|request| {
                let client = &client;
                async move {
                    let result = generator::generate(client, &request).await;
                    (request, result)
                }
            })
            .buffer_unordered(config.generation.parallel_generation.max(1))
            .collect()
            .await;

    let total = results.len();
    let mut stored = 0usize;
    for (request, result) in results {
        match result {
            Ok(generated) => {
                match store_generated_draft(
                    store,
                    &generated,
                    &request,
                    params.author_id,
                    params.category_id,
                ) {
                    Ok(id) => {
                        stored += 1;
                        println!(
                            "Drafted article {id}: {} (${:.4})",
                            generated.article.title, generated.cost
                        );
                    }
                    Err(e) => {
                        error!(topic = %request.topic, error = %e, "Failed to store draft")
                    }
                }
            }
            Err(e) => {
                error!(topic = %request.topic, error = %e, "Draft failed; skipping topic")
            }
        }
    }

    store.save().await?;
    println!("Stored {stored}/{total} draft(s) from trending topics");
    Ok(())
}

/// Insert a generated draft, start its workflow, and file its SEO analysis.
fn store_generated_draft(
    store: &mut Store,
    generated: &generator::Generated,
    request: &GenerationRequest,
    author_id: u64,
    category_id: u64,
) -> Result<u64, Box<dyn Error>> {
    let draft = &generated.article;
    let mut article = Article::draft(&draft.title, &draft.content, author_id, category_id);
    if !draft.subtitle.is_empty() {
        article.subtitle = Some(draft.subtitle.clone());
    }
    if !draft.excerpt.is_empty() {
        article.excerpt = Some(draft.excerpt.clone());
    }
    if !draft.meta_description.is_empty() {
        article.seo_description = Some(draft.meta_description.clone());
    }
    if !request.keywords.is_empty() {
        article.seo_keywords = Some(request.keywords.join(", "));
    }
    article.tags = draft.tags.clone();
    if draft.estimated_read_time > 0 {
        article.reading_time = draft.estimated_read_time;
    }

    let id = store.insert_article(article);
    workflow::start(store, id)?;

    let stored = store.article(id)?.clone();
    store.upsert_seo_record(seo::SeoRecord {
        article_id: id,
        report: seo::analyze(&stored),
        analyzed_at: Utc::now(),
    });
    Ok(id)
}

fn build_client(
    config: &DeskConfig,
    provider_name: &str,
    article_type: ArticleType,
) -> Result<ChatClient, Box<dyn Error>> {
    let provider =
        Provider::parse(provider_name).ok_or(format!("unknown provider {provider_name:?}"))?;
    let provider_config = match provider {
        Provider::OpenAi => &config.providers.openai,
        Provider::Claude => &config.providers.claude,
        Provider::DeepSeek => &config.providers.deepseek,
    };
    let api_key = provider_config
        .api_key
        .clone()
        .ok_or(format!("no API key configured for {provider_name}"))?;
    let model = provider_config
        .model
        .clone()
        .unwrap_or_else(|| generator::default_model(provider, article_type).to_string());
    Ok(ChatClient::new(
        provider,
        api_key,
        provider_config.api_base.clone(),
        model,
    ))
}

// ---- search ----

#[allow(clippy::too_many_arguments)]
async fn cmd_search(
    config: &DeskConfig,
    query: String,
    sort: String,
    date_range: String,
    category_slugs: Vec<String>,
    author_usernames: Vec<String>,
    page: usize,
    per_page: usize,
) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.data_dir).await?;

    let mut request = search::SearchRequest::new(&query);
    request.sort = search::SortOrder::parse(&sort);
    request.date_range = search::DateRange::parse(&date_range);
    request.page = page;
    request.per_page = per_page;
    for slug in &category_slugs {
        request
            .category_ids
            .push(resolve_category(&store, slug)?);
    }
    for username in &author_usernames {
        request.author_ids.push(resolve_user(&store, username)?);
    }

    let result = search::search(&store, &request, Utc::now())?;
    if result.pagination.total == 0 {
        println!(
            "No matches for terms {:?} (phrases {:?}, excluded {:?})",
            result.parsed.terms, result.parsed.phrases, result.parsed.excluded
        );
        return Ok(());
    }
    for hit in &result.hits {
        let relevance = hit
            .relevance
            .map(|score| format!("{score:>6.2}  "))
            .unwrap_or_default();
        let published = hit
            .article
            .published_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unpublished".to_string());
        println!(
            "{relevance}{:>4}  {}  {}  [{}]",
            hit.article.id, published, hit.article.title, hit.article.slug
        );
    }
    let p = &result.pagination;
    println!(
        "{} result(s), page {}/{}{}",
        p.total,
        p.page,
        p.pages.max(1),
        if p.has_next { " (more available)" } else { "" }
    );
    Ok(())
}

async fn cmd_suggest(
    config: &DeskConfig,
    partial: String,
    limit: usize,
) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.data_dir).await?;
    for suggestion in search::suggestions(&store, &partial, limit) {
        match suggestion {
            search::Suggestion::Article { title, slug } => {
                println!("article   {title}  [{slug}]")
            }
            search::Suggestion::Category { name, slug } => {
                println!("category  {name}  [{slug}]")
            }
            search::Suggestion::Author { name, username } => {
                println!("author    {name}  [{username}]")
            }
            search::Suggestion::Popular { term } => println!("popular   {term}"),
        }
    }
    Ok(())
}

// ---- publishing ----

async fn cmd_publish(
    config: &DeskConfig,
    json_output_dir: String,
    markdown_output_dir: String,
) -> Result<(), Box<dyn Error>> {
    let mut store = Store::open(&config.data_dir).await?;

    // Early check: both output dirs must be writable before we mutate state
    ensure_writable_dir(&json_output_dir).await?;
    ensure_writable_dir(&markdown_output_dir).await?;

    let released = workflow::release_due(&mut store, Utc::now());
    if !released.is_empty() {
        println!("Released {} scheduled article(s): {released:?}", released.len());
    }
    store.save().await?;

    let edition = outputs::build_edition(&store);
    info!(
        date = %edition.local_date,
        edition = %edition.time_of_day,
        articles = edition.articles.len(),
        "Edition assembled"
    );

    outputs::json::write_edition(&edition, &json_output_dir).await?;

    let markdown_filename = format!("{}_{}.md", edition.local_date, edition.time_of_day);
    let markdown_path = format!("{markdown_output_dir}/{markdown_filename}");
    let md = outputs::markdown::edition_to_markdown(&edition);
    tokio::fs::write(&markdown_path, md).await?;
    info!(path = %markdown_path, "Wrote edition Markdown");

    if let Err(e) =
        outputs::indexes::update_date_toc(&markdown_output_dir, &edition, &markdown_filename).await
    {
        error!(error = %e, "Failed to update date TOC file");
    }
    if let Err(e) = outputs::indexes::update_published_index(
        &markdown_output_dir,
        &edition,
        &markdown_filename,
    )
    .await
    {
        error!(error = %e, "Failed to update published.md index");
    }

    println!(
        "Published {} edition for {} with {} article(s)",
        upcase(&edition.time_of_day),
        edition.local_date,
        edition.articles.len()
    );
    Ok(())
}

// ---- shared lookups ----

fn resolve_user(store: &Store, username: &str) -> Result<u64, Box<dyn Error>> {
    store
        .user_by_username(username)
        .map(|u| u.id)
        .ok_or_else(|| format!("user {username:?} not found").into())
}

fn resolve_category(store: &Store, slug: &str) -> Result<u64, Box<dyn Error>> {
    store
        .category_by_slug(slug)
        .map(|c| c.id)
        .ok_or_else(|| format!("category {slug:?} not found").into())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
