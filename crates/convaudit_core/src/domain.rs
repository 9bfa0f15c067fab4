//! crates/convaudit_core/src/domain.rs
//!
//! Defines the pure, core data structures for the participation pipeline.
//! These structs are independent of the upstream wire format; decoding from
//! upstream JSON lives in the `wire` module.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The author of a single conversation part.
///
/// `id` is the canonically normalized admin/user/bot identifier: a decimal
/// string, regardless of whether the upstream emitted a JSON string or a
/// JSON number. `None` when the upstream omitted the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartAuthor {
    pub kind: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// One message/event within a conversation.
#[derive(Debug, Clone)]
pub struct Part {
    pub id: String,
    pub part_type: String,
    pub author: Option<PartAuthor>,
    pub body: Option<String>,
    /// Raw upstream timestamp. May be in seconds or milliseconds; the
    /// evaluator normalizes before comparing against a window.
    pub created_at: Option<i64>,
}

/// A customer-support thread, fully hydrated from the upstream API.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    /// Normalized to whole-second UTC Unix time.
    pub created_at: i64,
    /// Normalized to whole-second UTC Unix time.
    pub updated_at: i64,
    pub state: Option<String>,
    pub subject: Option<String>,
    pub source_author_name: Option<String>,
    pub parts: Vec<Part>,
    /// Upstream conversation rating, 1-5, when a contact left one.
    pub rating: Option<i64>,
    pub contact_ids: Vec<String>,
}

/// The time window a participation query runs over.
///
/// Invariant: `since < before`; both are whole-second Unix timestamps in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    pub admin_id: String,
    pub since: i64,
    pub before: i64,
}

impl SearchWindow {
    pub fn new(admin_id: impl Into<String>, since: i64, before: i64) -> Option<Self> {
        if since >= before {
            return None;
        }
        Some(Self {
            admin_id: admin_id.into(),
            since,
            before,
        })
    }

    /// Maps a calendar date `D` onto the window
    /// `[D 00:00:00 UTC, D 23:59:59 UTC]`.
    pub fn for_date(admin_id: impl Into<String>, date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
        let end = Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap());
        Self {
            admin_id: admin_id.into(),
            since: start.timestamp(),
            before: end.timestamp(),
        }
    }

    /// The calendar-date label (UTC) of the window start, used when echoing
    /// the query back in a report.
    pub fn date_label(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.since, 0) {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => String::new(),
        }
    }
}

/// The outcome of evaluating one conversation against one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participation {
    pub matched: bool,
    pub part_count: u32,
}

/// One page of candidate conversation IDs returned by the discovery stage.
///
/// The IDs are unverified: discovery matches on assignment, not on authored
/// replies, so this is a superset of the conversations the admin actually
/// participated in.
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    pub ids: Vec<String>,
    /// Upstream's estimate of how many conversations match the search query.
    pub total_count: u64,
    pub next_cursor: Option<String>,
}

/// One verified conversation row in a report, annotated with how many parts
/// the admin authored inside the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_at_iso: String,
    pub updated_at_iso: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    pub participation_part_count: u32,
}

impl ReportRow {
    pub fn from_conversation(conversation: &Conversation, part_count: u32) -> Self {
        Self {
            id: conversation.id.clone(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            created_at_iso: iso8601(conversation.created_at),
            updated_at_iso: iso8601(conversation.updated_at),
            state: conversation.state.clone(),
            subject: conversation.subject.clone(),
            source_author_name: conversation.source_author_name.clone(),
            rating: conversation.rating,
            participation_part_count: part_count,
        }
    }
}

/// One page of the pipeline's output, as served over HTTP and as consumed
/// by the progressive loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPage {
    pub conversations: Vec<ReportRow>,
    /// Number of verified conversations in this page.
    pub total_count: u64,
    /// Upstream's total-count estimate for the discovery query.
    pub intercom_total_count: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub admin_id: String,
    pub date: String,
    /// Sum of `participation_part_count` across the rows of this page.
    pub participation_count: u64,
    /// Candidates that were fetched and evaluated, matched or not.
    pub processed_count: u64,
    /// Candidates whose fetch failed and were excluded.
    pub error_count: u64,
}

fn iso8601(epoch_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_default()
}
