//! Index file management for published editions.
//!
//! Two index files keep the Markdown output navigable:
//!
//! - **Date TOC** (`{date}.md`): every edition published that day, with
//!   per-category article anchors into the edition document
//! - **`published.md`**: master index of all dates and editions
//!
//! Publishing runs several times a day, so both updates are idempotent:
//! re-running an edition neither duplicates its entry nor disturbs its
//! neighbors.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use super::{Edition, EditionArticle};
use crate::utils::{slugify, upcase};

/// Append this edition to the date's table of contents.
///
/// Creates `{markdown_output_dir}/{date}.md` with a header on first write;
/// re-runs of the same edition are skipped.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir, date = %edition.local_date, file = %markdown_filename))]
pub async fn update_date_toc(
    markdown_output_dir: &str,
    edition: &Edition,
    markdown_filename: &str,
) -> Result<(), Box<dyn Error>> {
    let toc_path = format!("{}/{}.md", markdown_output_dir, edition.local_date);
    let edition_line = format!(
        "- [{}](./{})",
        upcase(&edition.time_of_day),
        markdown_filename
    );

    if Path::new(&toc_path).exists() {
        let existing = fs::read_to_string(&toc_path).await?;
        if existing.lines().any(|l| l.trim() == edition_line.trim()) {
            info!(path = %toc_path, "Edition already in TOC; skipping");
            return Ok(());
        }
    }

    let mut toc_md = String::new();
    if !Path::new(&toc_path).exists() {
        writeln!(toc_md, "# Editions published on {}\n", edition.local_date).unwrap();
    }
    writeln!(toc_md, "{edition_line}").unwrap();

    let mut by_category: BTreeMap<&str, Vec<&EditionArticle>> = BTreeMap::new();
    for article in &edition.articles {
        by_category
            .entry(article.category.as_str())
            .or_default()
            .push(article);
    }

    for (category, articles) in by_category {
        writeln!(
            toc_md,
            "\t- [**{}**]({}#{})",
            category,
            markdown_filename,
            slugify(category)
        )
        .unwrap();
        for article in articles {
            writeln!(
                toc_md,
                "\t\t- [{}]({}#{}) — {}",
                article.title,
                markdown_filename,
                slugify(&article.title),
                article.author
            )
            .unwrap();
        }
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&toc_path)
        .await?;
    file.write_all(toc_md.as_bytes()).await?;
    info!(path = %toc_path, "Updated TOC file");
    Ok(())
}

/// Add this edition to the master `published.md` index.
///
/// The index groups editions under date headings:
///
/// ```text
/// # Published Editions
///
/// - [**2026-08-06**](./2026-08-06.md)
///     - [Morning](./2026-08-06_morning.md)
///     - [Evening](./2026-08-06_evening.md)
/// ```
#[instrument(level = "info", skip_all, fields(%markdown_output_dir, date = %edition.local_date, file = %markdown_filename))]
pub async fn update_published_index(
    markdown_output_dir: &str,
    edition: &Edition,
    markdown_filename: &str,
) -> Result<(), Box<dyn Error>> {
    let index_path = format!("{markdown_output_dir}/published.md");
    let mut content = String::new();

    if Path::new(&index_path).exists() {
        content = fs::read_to_string(&index_path).await?;
    } else {
        content.push_str("# Published Editions\n\n");
    }

    let date_heading = format!(
        "- [**{}**](./{}.md)",
        edition.local_date, edition.local_date
    );
    let edition_entry = format!(
        "    - [{}](./{})",
        upcase(&edition.time_of_day),
        markdown_filename
    );

    let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let mut inserted = false;
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim() == date_heading.trim() {
            let mut j = i + 1;
            let mut found_edition = false;
            while j < lines.len() && lines[j].starts_with("    - ") {
                if lines[j].trim() == edition_entry.trim() {
                    found_edition = true;
                    break;
                }
                j += 1;
            }
            if !found_edition {
                lines.insert(j, edition_entry.clone());
            }
            inserted = true;
            break;
        }
        i += 1;
    }

    if !inserted {
        if let Some(pos) = lines
            .iter()
            .position(|l| l.starts_with("# Published Editions"))
        {
            let insert_at = pos + 1;
            lines.insert(insert_at, "".to_string());
            lines.insert(insert_at + 1, date_heading.clone());
            lines.insert(insert_at + 2, edition_entry.clone());
        } else {
            lines.push(date_heading.clone());
            lines.push(edition_entry.clone());
        }
    }

    fs::write(&index_path, lines.join("\n")).await?;
    info!(path = %index_path, "Updated published.md index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn edition(time_of_day: &str) -> Edition {
        Edition {
            local_date: "2026-08-06".to_string(),
            time_of_day: time_of_day.to_string(),
            local_time: "20:15:00".to_string(),
            articles: vec![EditionArticle {
                id: 1,
                title: "Grid Storage Arrives".to_string(),
                slug: "grid-storage-arrives".to_string(),
                subtitle: None,
                excerpt: None,
                category: "Business".to_string(),
                author: "Jane Smith".to_string(),
                tags: vec![],
                reading_time: 3,
                published_at: Utc::now(),
                content: "Body.".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_date_toc_created_and_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let edition = edition("evening");

        update_date_toc(dir, &edition, "2026-08-06_evening.md")
            .await
            .unwrap();
        update_date_toc(dir, &edition, "2026-08-06_evening.md")
            .await
            .unwrap();

        let toc = std::fs::read_to_string(format!("{dir}/2026-08-06.md")).unwrap();
        assert!(toc.starts_with("# Editions published on 2026-08-06"));
        assert_eq!(toc.matches("[Evening]").count(), 1);
        assert!(toc.contains("[Grid Storage Arrives](2026-08-06_evening.md#grid-storage-arrives)"));
    }

    #[tokio::test]
    async fn test_published_index_groups_editions_under_date() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        update_published_index(dir, &edition("morning"), "2026-08-06_morning.md")
            .await
            .unwrap();
        update_published_index(dir, &edition("evening"), "2026-08-06_evening.md")
            .await
            .unwrap();
        // the same edition twice must not duplicate
        update_published_index(dir, &edition("evening"), "2026-08-06_evening.md")
            .await
            .unwrap();

        let index = std::fs::read_to_string(format!("{dir}/published.md")).unwrap();
        assert!(index.starts_with("# Published Editions"));
        assert_eq!(index.matches("[**2026-08-06**]").count(), 1);
        assert_eq!(index.matches("[Morning]").count(), 1);
        assert_eq!(index.matches("[Evening]").count(), 1);
    }
}
