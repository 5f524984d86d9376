//! Editorial workflow: the ladder every article climbs before publication.
//!
//! A [`WorkflowStep`] describes one rung (name, order, the role allowed to
//! act on it, whether it completes by itself). A [`WorkflowEntry`] is one
//! article's progress on one rung; an article has at most one open entry at
//! a time.
//!
//! The default ladder seeded by `init`:
//!
//! | # | Step             | Role   | Auto |
//! |---|------------------|--------|------|
//! | 1 | Draft Creation   | author | yes  |
//! | 2 | Editorial Review | editor | no   |
//! | 3 | Final Approval   | admin  | no   |
//! | 4 | Publication      | admin  | yes  |
//!
//! Completing a step opens the next one by order. Steps marked auto-advance
//! complete themselves the moment they open, so starting a workflow runs the
//! article straight to Editorial Review, and Final Approval runs it straight
//! through Publication. Completing the last step publishes the article,
//! immediately or as `Scheduled` when a future `scheduled_at` is set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument, warn};

use crate::models::{ArticleStatus, Role};
use crate::store::Store;

/// One rung of the editorial ladder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowStep {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: u32,
    pub required_role: Role,
    pub auto_advance: bool,
    pub is_active: bool,
}

/// Progress state of one article on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl StepStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, StepStatus::Pending | StepStatus::InProgress)
    }
}

/// One article's progress on one step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowEntry {
    pub id: u64,
    pub article_id: u64,
    pub step_id: u64,
    #[serde(default)]
    pub assigned_to: Option<u64>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The default editorial ladder.
pub fn default_steps() -> Vec<WorkflowStep> {
    let step = |id, name: &str, order, required_role, auto_advance| WorkflowStep {
        id,
        name: name.to_string(),
        description: None,
        order,
        required_role,
        auto_advance,
        is_active: true,
    };
    vec![
        step(1, "Draft Creation", 1, Role::Author, true),
        step(2, "Editorial Review", 2, Role::Editor, false),
        step(3, "Final Approval", 3, Role::Admin, false),
        step(4, "Publication", 4, Role::Admin, true),
    ]
}

/// Seed the default ladder if no steps exist yet.
pub fn seed_default_steps(store: &mut Store) {
    if store.workflow_steps.is_empty() {
        store.workflow_steps = default_steps();
        info!(steps = store.workflow_steps.len(), "Seeded default workflow steps");
    }
}

/// Start an article's editorial workflow at the lowest-ordered active step.
///
/// Auto-advancing steps complete immediately, so with the default ladder the
/// article lands on Editorial Review.
#[instrument(level = "info", skip(store))]
pub fn start(store: &mut Store, article_id: u64) -> Result<(), Box<dyn Error>> {
    store.article(article_id)?;
    if open_entry(store, article_id).is_some() {
        return Err(format!("article {article_id} already has an open workflow step").into());
    }
    let first = active_steps(store)
        .into_iter()
        .next()
        .ok_or("no active workflow steps; run `newsdesk init`")?;
    open_step(store, article_id, first);
    run_auto_steps(store, article_id)?;
    Ok(())
}

/// Complete the article's open step as `actor`, opening the next one.
///
/// The actor's role must be at least the step's required role. Completing
/// the final step publishes the article.
#[instrument(level = "info", skip(store, notes))]
pub fn complete(
    store: &mut Store,
    article_id: u64,
    actor_id: u64,
    notes: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let (entry_id, step_id) = require_open_entry(store, article_id)?;
    let step = step_by_id(store, step_id)?.clone();
    check_actor(store, actor_id, &step)?;

    close_entry(store, entry_id, StepStatus::Completed, Some(actor_id), notes);
    info!(article_id, step = %step.name, actor_id, "Workflow step completed");

    match next_step(store, step.order) {
        Some(next) => {
            open_step(store, article_id, next);
            run_auto_steps(store, article_id)?;
        }
        None => finalize_publication(store, article_id)?,
    }
    Ok(())
}

/// Reject the article at its open step and send it back to draft.
#[instrument(level = "info", skip(store, notes))]
pub fn reject(
    store: &mut Store,
    article_id: u64,
    actor_id: u64,
    notes: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let (entry_id, step_id) = require_open_entry(store, article_id)?;
    let step = step_by_id(store, step_id)?.clone();
    check_actor(store, actor_id, &step)?;

    close_entry(store, entry_id, StepStatus::Rejected, Some(actor_id), notes);
    store.article_mut(article_id)?.status = ArticleStatus::Draft;
    warn!(article_id, step = %step.name, actor_id, "Workflow step rejected; article back to draft");
    Ok(())
}

/// Release every scheduled article whose time has come.
///
/// Failures are per-article; the sweep continues. Returns the ids published.
#[instrument(level = "info", skip(store))]
pub fn release_due(store: &mut Store, now: DateTime<Utc>) -> Vec<u64> {
    let due: Vec<u64> = store
        .articles
        .iter()
        .filter(|a| {
            a.status == ArticleStatus::Scheduled
                && a.scheduled_at.map(|at| at <= now).unwrap_or(false)
        })
        .map(|a| a.id)
        .collect();

    let mut released = Vec::new();
    for id in due {
        match store.article_mut(id) {
            Ok(article) => {
                article.status = ArticleStatus::Published;
                article.published_at = Some(now);
                info!(article_id = id, "Released scheduled article");
                released.push(id);
            }
            Err(e) => warn!(article_id = id, error = %e, "Failed to release scheduled article"),
        }
    }
    released
}

/// The article's workflow history, oldest first.
pub fn history<'a>(store: &'a Store, article_id: u64) -> Vec<&'a WorkflowEntry> {
    let mut entries: Vec<&WorkflowEntry> = store
        .workflow_entries
        .iter()
        .filter(|e| e.article_id == article_id)
        .collect();
    entries.sort_by_key(|e| e.id);
    entries
}

/// The article's currently open entry, if any.
pub fn open_entry<'a>(store: &'a Store, article_id: u64) -> Option<&'a WorkflowEntry> {
    store
        .workflow_entries
        .iter()
        .find(|e| e.article_id == article_id && e.status.is_open())
}

fn require_open_entry(store: &Store, article_id: u64) -> Result<(u64, u64), Box<dyn Error>> {
    store.article(article_id)?;
    open_entry(store, article_id)
        .map(|e| (e.id, e.step_id))
        .ok_or_else(|| format!("article {article_id} has no open workflow step").into())
}

fn check_actor(store: &Store, actor_id: u64, step: &WorkflowStep) -> Result<(), Box<dyn Error>> {
    let actor = store.user(actor_id)?;
    if !actor.is_active {
        return Err(format!("user {} is inactive", actor.username).into());
    }
    if actor.role < step.required_role {
        return Err(format!(
            "step '{}' requires at least {:?}; {} is {:?}",
            step.name, step.required_role, actor.username, actor.role
        )
        .into());
    }
    Ok(())
}

fn active_steps(store: &Store) -> Vec<WorkflowStep> {
    let mut steps: Vec<WorkflowStep> = store
        .workflow_steps
        .iter()
        .filter(|s| s.is_active)
        .cloned()
        .collect();
    steps.sort_by_key(|s| s.order);
    steps
}

fn next_step(store: &Store, after_order: u32) -> Option<WorkflowStep> {
    active_steps(store)
        .into_iter()
        .find(|s| s.order > after_order)
}

fn step_by_id(store: &Store, step_id: u64) -> Result<&WorkflowStep, Box<dyn Error>> {
    store
        .workflow_steps
        .iter()
        .find(|s| s.id == step_id)
        .ok_or_else(|| format!("workflow step {step_id} not found").into())
}

fn open_step(store: &mut Store, article_id: u64, step: WorkflowStep) {
    let id = store
        .workflow_entries
        .iter()
        .map(|e| e.id)
        .max()
        .unwrap_or(0)
        + 1;
    store.workflow_entries.push(WorkflowEntry {
        id,
        article_id,
        step_id: step.id,
        assigned_to: None,
        status: StepStatus::Pending,
        started_at: Utc::now(),
        completed_at: None,
        notes: None,
    });
    info!(article_id, step = %step.name, "Opened workflow step");
}

fn close_entry(
    store: &mut Store,
    entry_id: u64,
    status: StepStatus,
    actor_id: Option<u64>,
    notes: Option<String>,
) {
    if let Some(entry) = store.workflow_entries.iter_mut().find(|e| e.id == entry_id) {
        entry.status = status;
        entry.completed_at = Some(Utc::now());
        entry.assigned_to = actor_id;
        if notes.is_some() {
            entry.notes = notes;
        }
    }
}

/// Complete every auto-advancing step sitting open on the article.
fn run_auto_steps(store: &mut Store, article_id: u64) -> Result<(), Box<dyn Error>> {
    loop {
        let Some(entry) = open_entry(store, article_id) else {
            return Ok(());
        };
        let step = step_by_id(store, entry.step_id)?.clone();
        if !step.auto_advance {
            return Ok(());
        }
        let entry_id = entry.id;
        close_entry(store, entry_id, StepStatus::Completed, None, None);
        info!(article_id, step = %step.name, "Auto-advanced workflow step");
        match next_step(store, step.order) {
            Some(next) => open_step(store, article_id, next),
            None => return finalize_publication(store, article_id),
        }
    }
}

/// Publish now, or hold for the scheduler when a future time is set.
fn finalize_publication(store: &mut Store, article_id: u64) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let article = store.article_mut(article_id)?;
    match article.scheduled_at {
        Some(at) if at > now => {
            article.status = ArticleStatus::Scheduled;
            info!(article_id, scheduled_at = %at, "Article approved; holding for scheduled release");
        }
        _ => {
            article.status = ArticleStatus::Published;
            article.published_at = Some(now);
            info!(article_id, "Article published");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, User};
    use chrono::Duration;

    fn test_store() -> Store {
        let mut store = Store::empty("/tmp/unused");
        seed_default_steps(&mut store);
        store
    }

    fn add_user(store: &mut Store, username: &str, role: Role) -> u64 {
        store
            .insert_user(User {
                id: 0,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                bio: None,
                is_active: true,
                created_at: Utc::now(),
            })
            .unwrap()
    }

    fn draft_article(store: &mut Store) -> u64 {
        store.insert_article(Article::draft("Workflow Story", "body", 1, 1))
    }

    #[test]
    fn test_start_lands_on_editorial_review() {
        let mut store = test_store();
        let article = draft_article(&mut store);
        start(&mut store, article).unwrap();

        // Draft Creation auto-completed; Editorial Review open.
        let open = open_entry(&store, article).unwrap();
        assert_eq!(open.step_id, 2);
        assert_eq!(history(&store, article).len(), 2);
    }

    #[test]
    fn test_double_start_rejected() {
        let mut store = test_store();
        let article = draft_article(&mut store);
        start(&mut store, article).unwrap();
        assert!(start(&mut store, article).is_err());
    }

    #[test]
    fn test_role_gate_blocks_author_on_review() {
        let mut store = test_store();
        let author = add_user(&mut store, "writer", Role::Author);
        let article = draft_article(&mut store);
        start(&mut store, article).unwrap();

        let result = complete(&mut store, article, author, None);
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("Editorial Review"));
    }

    #[test]
    fn test_full_ladder_publishes() {
        let mut store = test_store();
        let editor = add_user(&mut store, "editor", Role::Editor);
        let admin = add_user(&mut store, "chief", Role::Admin);
        let article = draft_article(&mut store);

        start(&mut store, article).unwrap();
        complete(&mut store, article, editor, Some("reads clean".to_string())).unwrap();
        // Final Approval open, admin completes; Publication auto-advances.
        complete(&mut store, article, admin, None).unwrap();

        let published = store.article(article).unwrap();
        assert_eq!(published.status, ArticleStatus::Published);
        assert!(published.published_at.is_some());
        assert!(open_entry(&store, article).is_none());
    }

    #[test]
    fn test_future_schedule_holds_article() {
        let mut store = test_store();
        let editor = add_user(&mut store, "editor", Role::Editor);
        let admin = add_user(&mut store, "chief", Role::Admin);
        let article = draft_article(&mut store);
        store.article_mut(article).unwrap().scheduled_at = Some(Utc::now() + Duration::hours(6));

        start(&mut store, article).unwrap();
        complete(&mut store, article, editor, None).unwrap();
        complete(&mut store, article, admin, None).unwrap();

        let held = store.article(article).unwrap();
        assert_eq!(held.status, ArticleStatus::Scheduled);
        assert!(held.published_at.is_none());
    }

    #[test]
    fn test_release_due_publishes_only_past_schedules() {
        let mut store = test_store();
        let past = draft_article(&mut store);
        let future = store.insert_article(Article::draft("Later", "body", 1, 1));
        {
            let a = store.article_mut(past).unwrap();
            a.status = ArticleStatus::Scheduled;
            a.scheduled_at = Some(Utc::now() - Duration::minutes(5));
        }
        {
            let a = store.article_mut(future).unwrap();
            a.status = ArticleStatus::Scheduled;
            a.scheduled_at = Some(Utc::now() + Duration::hours(2));
        }

        let released = release_due(&mut store, Utc::now());
        assert_eq!(released, vec![past]);
        assert_eq!(store.article(past).unwrap().status, ArticleStatus::Published);
        assert_eq!(store.article(future).unwrap().status, ArticleStatus::Scheduled);
    }

    #[test]
    fn test_reject_returns_to_draft() {
        let mut store = test_store();
        let editor = add_user(&mut store, "editor", Role::Editor);
        let article = draft_article(&mut store);
        start(&mut store, article).unwrap();

        reject(&mut store, article, editor, Some("needs sourcing".to_string())).unwrap();
        assert_eq!(store.article(article).unwrap().status, ArticleStatus::Draft);
        assert!(open_entry(&store, article).is_none());
        let last = history(&store, article).last().cloned().cloned().unwrap();
        assert_eq!(last.status, StepStatus::Rejected);
        assert_eq!(last.notes.as_deref(), Some("needs sourcing"));
    }
}
