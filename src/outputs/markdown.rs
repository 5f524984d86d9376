//! Markdown edition rendering.
//!
//! One edition renders to one document: a dated header, then articles
//! grouped by category (alphabetically), each with byline, read time,
//! excerpt, body, and tags. Headings slugify to the anchors the date TOC
//! links against.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::{Edition, EditionArticle};
use crate::utils::upcase;

/// Render an edition as a Markdown document.
pub fn edition_to_markdown(edition: &Edition) -> String {
    let mut md = String::new();
    writeln!(
        md,
        "# {} — {} Edition\n",
        edition.local_date,
        upcase(&edition.time_of_day)
    )
    .unwrap();
    writeln!(md, "*Assembled at {}*\n", edition.local_time).unwrap();

    if edition.articles.is_empty() {
        writeln!(md, "_No articles published in this edition._").unwrap();
        return md;
    }

    let mut by_category: BTreeMap<&str, Vec<&EditionArticle>> = BTreeMap::new();
    for article in &edition.articles {
        by_category
            .entry(article.category.as_str())
            .or_default()
            .push(article);
    }

    for (category, articles) in by_category {
        writeln!(md, "## {category}\n").unwrap();
        for article in articles {
            writeln!(md, "### {}\n", article.title).unwrap();
            if let Some(subtitle) = &article.subtitle {
                writeln!(md, "*{subtitle}*\n").unwrap();
            }
            writeln!(
                md,
                "By {} · {} min read · {}\n",
                article.author,
                article.reading_time,
                article.published_at.format("%H:%M UTC")
            )
            .unwrap();
            if let Some(excerpt) = &article.excerpt {
                writeln!(md, "> {excerpt}\n").unwrap();
            }
            writeln!(md, "{}\n", article.content.trim()).unwrap();
            if !article.tags.is_empty() {
                let tags = article
                    .tags
                    .iter()
                    .map(|t| format!("`{t}`"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(md, "{tags}\n").unwrap();
            }
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(title: &str, category: &str) -> EditionArticle {
        EditionArticle {
            id: 1,
            title: title.to_string(),
            slug: crate::utils::slugify(title),
            subtitle: Some("A closer look".to_string()),
            excerpt: Some("The short version.".to_string()),
            category: category.to_string(),
            author: "Jane Smith".to_string(),
            tags: vec!["energy".to_string()],
            reading_time: 4,
            published_at: Utc::now(),
            content: "Body paragraph one.\n\nBody paragraph two.".to_string(),
        }
    }

    fn edition(articles: Vec<EditionArticle>) -> Edition {
        Edition {
            local_date: "2026-08-06".to_string(),
            time_of_day: "evening".to_string(),
            local_time: "20:15:00".to_string(),
            articles,
        }
    }

    #[test]
    fn test_renders_header_and_groups_by_category() {
        let md = edition_to_markdown(&edition(vec![
            article("Grid Storage Arrives", "Business"),
            article("Summit Opens", "World"),
            article("Ports Reopen", "Business"),
        ]));

        assert!(md.starts_with("# 2026-08-06 — Evening Edition"));
        // Business sorts before World and carries both of its articles
        let business = md.find("## Business").unwrap();
        let world = md.find("## World").unwrap();
        assert!(business < world);
        assert!(md.contains("### Grid Storage Arrives"));
        assert!(md.contains("By Jane Smith · 4 min read"));
        assert!(md.contains("> The short version."));
        assert!(md.contains("`energy`"));
    }

    #[test]
    fn test_empty_edition_renders_placeholder() {
        let md = edition_to_markdown(&edition(vec![]));
        assert!(md.contains("_No articles published in this edition._"));
    }
}
