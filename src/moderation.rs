//! Comment validation, spam scoring, and thread assembly.
//!
//! Spam detection is a fixed-weight point total over cheap text checks; no
//! model, no network. A comment lands in one of three buckets on intake:
//! score >= 5 is spam, score >= 3 goes to the moderation queue, anything
//! cleaner is publishable (subject to the desk's auto-approve policy).

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::models::{Comment, CommentStatus};

/// Phrases that immediately raise the spam score.
const SPAM_KEYWORDS: &[&str] = &[
    "viagra",
    "casino",
    "lottery",
    "winner",
    "congratulations",
    "click here",
    "free money",
    "make money fast",
    "work from home",
    "lose weight",
    "diet pills",
    "enlargement",
    "mortgage",
];

/// Disposable-mail providers; a reply address nobody will read.
const SUSPICIOUS_EMAIL_DOMAINS: &[&str] =
    &["tempmail", "10minutemail", "guerrillamail", "mailinator"];

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[A-Za-z0-9$\-_@.&+!*(),%/#?=~:]+").unwrap());

pub const MIN_CONTENT_LEN: usize = 3;
pub const MAX_CONTENT_LEN: usize = 5000;
pub const MAX_NAME_LEN: usize = 100;

/// Validate comment fields, returning every violation found.
pub fn validate(
    content: &str,
    author_name: Option<&str>,
    author_email: Option<&str>,
    author_website: Option<&str>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if content.trim().chars().count() < MIN_CONTENT_LEN {
        errors.push(format!(
            "Comment must be at least {MIN_CONTENT_LEN} characters long"
        ));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        errors.push(format!(
            "Comment is too long (maximum {MAX_CONTENT_LEN} characters)"
        ));
    }

    if let Some(name) = author_name {
        if name.chars().count() > MAX_NAME_LEN {
            errors.push(format!("Name is too long (maximum {MAX_NAME_LEN} characters)"));
        }
    }

    if let Some(email) = author_email {
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            errors.push("Invalid email format".to_string());
        }
    }

    if let Some(website) = author_website {
        if !website.is_empty() {
            match Url::parse(website) {
                Ok(parsed) if parsed.has_host() => {}
                _ => errors.push("Invalid website URL".to_string()),
            }
        }
    }

    errors
}

/// Outcome of the spam heuristics for one comment.
#[derive(Debug, Clone)]
pub struct SpamVerdict {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl SpamVerdict {
    pub fn is_spam(&self) -> bool {
        self.score >= 5
    }

    pub fn is_suspicious(&self) -> bool {
        self.score >= 3
    }
}

/// Run the fixed-weight spam checks.
///
/// Weights, in order: +2 per spam keyword, +link count when there are more
/// than two links, +3 for a caps ratio above 0.3, +2 for a run of five or
/// more identical characters, +3 for a disposable email domain.
pub fn detect_spam(content: &str, author_email: Option<&str>) -> SpamVerdict {
    let mut score = 0u32;
    let mut reasons = Vec::new();
    let content_lower = content.to_lowercase();

    for keyword in SPAM_KEYWORDS {
        if content_lower.contains(keyword) {
            score += 2;
            reasons.push(format!("Contains spam keyword: {keyword}"));
        }
    }

    let link_count = LINK_RE.find_iter(content).count();
    if link_count > 2 {
        score += link_count as u32;
        reasons.push(format!("Too many links: {link_count}"));
    }

    let total_chars = content.chars().count().max(1);
    let caps = content.chars().filter(|c| c.is_uppercase()).count();
    if caps as f64 / total_chars as f64 > 0.3 {
        score += 3;
        reasons.push("Excessive capitalization".to_string());
    }

    if has_repeated_run(content, 5) {
        score += 2;
        reasons.push("Repeated characters".to_string());
    }

    if let Some(email) = author_email {
        let domain = email.rsplit('@').next().unwrap_or("").to_lowercase();
        if SUSPICIOUS_EMAIL_DOMAINS.iter().any(|d| domain.contains(d)) {
            score += 3;
            reasons.push("Suspicious email domain".to_string());
        }
    }

    SpamVerdict { score, reasons }
}

/// Initial moderation status for a freshly scored comment.
pub fn intake_status(verdict: &SpamVerdict, auto_approve: bool) -> CommentStatus {
    if verdict.is_spam() {
        CommentStatus::Spam
    } else if verdict.is_suspicious() || !auto_approve {
        CommentStatus::Pending
    } else {
        CommentStatus::Approved
    }
}

// The backreference-free equivalent of matching `(.)\1{4,}`.
fn has_repeated_run(content: &str, run_len: usize) -> bool {
    let mut last: Option<char> = None;
    let mut run = 0usize;
    for c in content.chars() {
        if Some(c) == last {
            run += 1;
            if run >= run_len {
                return true;
            }
        } else {
            last = Some(c);
            run = 1;
        }
    }
    false
}

/// A comment with its nested replies.
#[derive(Debug)]
pub struct CommentThread<'a> {
    pub comment: &'a Comment,
    pub replies: Vec<CommentThread<'a>>,
}

/// Assemble the reply tree for one article's comments.
///
/// Roots are comments with no parent; replies keep insertion order. A reply
/// whose parent is missing (deleted, or filtered out upstream) is dropped
/// rather than promoted to a root.
pub fn build_tree<'a>(comments: &[&'a Comment]) -> Vec<CommentThread<'a>> {
    fn collect<'a>(comments: &[&'a Comment], parent_id: Option<u64>) -> Vec<CommentThread<'a>> {
        comments
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .map(|c| CommentThread {
                comment: c,
                replies: collect(comments, Some(c.id)),
            })
            .collect()
    }
    collect(comments, None)
}

/// Nesting depth of a comment, walking parents, capped at `max_depth`.
pub fn depth(comments: &[Comment], comment: &Comment, max_depth: u32) -> u32 {
    let mut depth = 0u32;
    let mut current = comment;
    while let Some(parent_id) = current.parent_id {
        if depth >= max_depth {
            break;
        }
        match comments.iter().find(|c| c.id == parent_id) {
            Some(parent) => {
                current = parent;
                depth += 1;
            }
            None => break,
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(id: u64, parent_id: Option<u64>) -> Comment {
        Comment {
            id,
            article_id: 1,
            parent_id,
            author_id: None,
            author_name: "Reader".to_string(),
            author_email: None,
            author_website: None,
            content: "a comment".to_string(),
            status: CommentStatus::Approved,
            spam_score: 0,
            like_count: 0,
            report_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_clean_comment() {
        let errors = validate(
            "This is a thoughtful reply.",
            Some("Jane Reader"),
            Some("jane@example.com"),
            Some("https://example.com/blog"),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_collects_all_violations() {
        let long_name = "x".repeat(150);
        let errors = validate("hi", Some(&long_name), Some("not-an-email"), Some("no-scheme"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_spam_keywords_add_two_each() {
        let verdict = detect_spam("free money from our casino", None);
        assert_eq!(verdict.score, 4);
        assert!(!verdict.is_spam());
        assert!(verdict.is_suspicious());
    }

    #[test]
    fn test_link_flood_scores_link_count() {
        let content =
            "see https://a.example https://b.example https://c.example https://d.example";
        let verdict = detect_spam(content, None);
        assert_eq!(verdict.score, 4);
        assert!(verdict.reasons.iter().any(|r| r.contains("Too many links")));
    }

    #[test]
    fn test_two_links_are_fine() {
        let verdict = detect_spam("see https://a.example and https://b.example", None);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_shouting_and_repeats() {
        let verdict = detect_spam("AMAZING DEAL!!!!! BUY NOW", None);
        // caps ratio over 0.3 (+3) and the !!!!! run (+2)
        assert_eq!(verdict.score, 5);
        assert!(verdict.is_spam());
    }

    #[test]
    fn test_disposable_email_domain() {
        let verdict = detect_spam("nice article", Some("bot@mailinator.com"));
        assert_eq!(verdict.score, 3);
        assert!(verdict.is_suspicious());
        assert!(!verdict.is_spam());
    }

    #[test]
    fn test_clean_comment_scores_zero() {
        let verdict = detect_spam(
            "Good piece. The section on grid storage matched what I saw at work.",
            Some("reader@example.com"),
        );
        assert_eq!(verdict.score, 0);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_intake_status_buckets() {
        let clean = SpamVerdict { score: 0, reasons: vec![] };
        let suspicious = SpamVerdict { score: 3, reasons: vec![] };
        let spam = SpamVerdict { score: 6, reasons: vec![] };

        assert_eq!(intake_status(&clean, true), CommentStatus::Approved);
        assert_eq!(intake_status(&clean, false), CommentStatus::Pending);
        assert_eq!(intake_status(&suspicious, true), CommentStatus::Pending);
        assert_eq!(intake_status(&spam, true), CommentStatus::Spam);
    }

    #[test]
    fn test_build_tree_nests_replies() {
        let comments = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(1)),
            comment(4, Some(2)),
            comment(5, None),
        ];
        let refs: Vec<&Comment> = comments.iter().collect();
        let tree = build_tree(&refs);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, 1);
        assert_eq!(tree[0].replies.len(), 2);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, 4);
        assert_eq!(tree[1].comment.id, 5);
    }

    #[test]
    fn test_depth_walks_parents_with_cap() {
        let mut comments = vec![comment(1, None)];
        for id in 2..=8 {
            comments.push(comment(id, Some(id - 1)));
        }
        assert_eq!(depth(&comments, &comments[0], 5), 0);
        assert_eq!(depth(&comments, &comments[2], 5), 2);
        // deep chains stop at the cap
        assert_eq!(depth(&comments, &comments[7], 5), 5);
    }
}
