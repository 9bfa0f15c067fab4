//! services/api/src/web/pipeline.rs
//!
//! The batch orchestrator: drives discovery, fetch and evaluation for one
//! report request.
//!
//! Discovery is deliberately coarse (it matches on teammate assignment), so
//! every candidate is re-verified against its actual message parts before it
//! may appear in the result. The confirmed set is always a subset of the
//! discovered set, never the reverse.

use convaudit_core::domain::{Conversation, ReportPage, ReportRow, SearchWindow};
use convaudit_core::evaluate::evaluate_participation;
use convaudit_core::ports::{ConversationSource, PortResult};
use futures::future::join_all;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;

/// Tunables for one orchestrator run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Hard cap on candidates per discovery page.
    pub search_page_cap: u32,
    /// Conversations fetched concurrently; the sole backpressure mechanism.
    pub batch_size: usize,
    /// Pause between batches, to stay under upstream rate limits.
    pub batch_pause: Duration,
    /// Wall-clock budget for the whole run.
    pub budget: Duration,
    /// Stop starting new batches this close to the budget.
    pub budget_margin: Duration,
    /// Ceiling on any single fetch, independent of the remaining budget.
    pub fetch_timeout_cap: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_page_cap: config.search_page_cap,
            batch_size: config.fetch_batch_size.max(1),
            batch_pause: config.batch_pause,
            budget: config.budget,
            budget_margin: config.budget_margin,
            fetch_timeout_cap: config.fetch_timeout_cap,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_page_cap: 150,
            batch_size: 10,
            batch_pause: Duration::from_millis(100),
            budget: Duration::from_secs(60),
            budget_margin: Duration::from_secs(5),
            fetch_timeout_cap: Duration::from_secs(15),
        }
    }
}

/// Runs one full discovery + verify cycle and assembles the response page.
pub async fn run_report(
    source: &dyn ConversationSource,
    window: &SearchWindow,
    cursor: Option<&str>,
    settings: &PipelineSettings,
) -> PortResult<ReportPage> {
    let started = Instant::now();

    // Stage 1: discovery. A failure here is fatal for the request.
    let candidates = source
        .search_conversations(window, cursor, settings.search_page_cap)
        .await?;
    info!(
        admin_id = %window.admin_id,
        candidate_count = candidates.ids.len(),
        upstream_total = candidates.total_count,
        "Discovery complete."
    );

    // Discovery's two OR legs can both match a conversation; keep one copy.
    let mut seen = HashSet::new();
    let unique_ids: Vec<&String> = candidates
        .ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .collect();

    let mut rows: Vec<ReportRow> = Vec::new();
    let mut processed_count = 0u64;
    let mut error_count = 0u64;
    let mut participation_count = 0u64;
    let mut budget_exhausted = false;

    // Stage 2: fetch + verify, one bounded batch at a time.
    let mut batches = unique_ids.chunks(settings.batch_size).peekable();
    while let Some(batch) = batches.next() {
        let elapsed = started.elapsed();
        if elapsed + settings.budget_margin >= settings.budget {
            warn!(
                ?elapsed,
                remaining_candidates = unique_ids.len() as u64 - processed_count - error_count,
                "Budget nearly exhausted; returning partial results."
            );
            budget_exhausted = true;
            break;
        }

        // Each fetch gets its own deadline derived from what is left of the
        // global budget, so a single hung request cannot blow past it.
        let per_fetch_deadline = (settings.budget - elapsed).min(settings.fetch_timeout_cap);
        let fetches = batch
            .iter()
            .map(|id| fetch_one(source, id, per_fetch_deadline));

        for fetched in join_all(fetches).await {
            let Some(conversation) = fetched else {
                error_count += 1;
                continue;
            };
            processed_count += 1;
            let participation = evaluate_participation(&conversation, window);
            if participation.matched {
                participation_count += u64::from(participation.part_count);
                rows.push(ReportRow::from_conversation(
                    &conversation,
                    participation.part_count,
                ));
            }
        }

        if batches.peek().is_some() {
            tokio::time::sleep(settings.batch_pause).await;
        }
    }

    // Rank by participation, heaviest first; ties keep discovery order.
    rows.sort_by(|a, b| b.participation_part_count.cmp(&a.participation_part_count));

    let has_more = budget_exhausted || candidates.next_cursor.is_some();
    info!(
        matched = rows.len(),
        processed_count,
        error_count,
        participation_count,
        has_more,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Report assembled."
    );

    Ok(ReportPage {
        total_count: rows.len() as u64,
        conversations: rows,
        intercom_total_count: candidates.total_count,
        has_more,
        next_cursor: candidates.next_cursor,
        admin_id: window.admin_id.clone(),
        date: window.date_label(),
        participation_count,
        processed_count,
        error_count,
    })
}

/// Fetches one conversation, absorbing every failure so that one bad ID
/// never aborts its batch. Failures only reduce the yield.
async fn fetch_one(
    source: &dyn ConversationSource,
    conversation_id: &str,
    deadline: Duration,
) -> Option<Conversation> {
    match tokio::time::timeout(deadline, source.fetch_conversation(conversation_id)).await {
        Ok(Ok(conversation)) => Some(conversation),
        Ok(Err(e)) => {
            warn!(conversation_id, error = %e, "Conversation fetch failed; skipping.");
            None
        }
        Err(_) => {
            warn!(conversation_id, ?deadline, "Conversation fetch timed out; skipping.");
            None
        }
    }
}
