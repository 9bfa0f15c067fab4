//! crates/convaudit_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the pipeline's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete upstream HTTP implementations.

use async_trait::async_trait;

use crate::domain::{CandidatePage, Conversation, ReportPage, SearchWindow};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The upstream API answered with a non-success status. The status and
    /// body are preserved verbatim for diagnostics.
    #[error("Upstream API error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a response (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream answered 2xx but the payload did not decode.
    #[error("Malformed upstream payload: {0}")]
    Decode(String),

    /// A catch-all for anything else.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Access to the upstream customer-support messaging API.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// Discovery: returns one page of candidate conversation IDs for the
    /// window, up to `per_page`. Candidates are matched on assignment and
    /// must still be verified by the evaluator. Read-only; any non-success
    /// upstream status is a hard failure.
    async fn search_conversations(
        &self,
        window: &SearchWindow,
        cursor: Option<&str>,
        per_page: u32,
    ) -> PortResult<CandidatePage>;

    /// Fetches one conversation with its full parts collection, rendered as
    /// plaintext so participation matching is not confused by markup.
    async fn fetch_conversation(&self, conversation_id: &str) -> PortResult<Conversation>;
}

/// Access to the pipeline's own report endpoint, as seen by a client
/// driving the progressive loader.
#[async_trait]
pub trait ReportPageSource: Send + Sync {
    async fn fetch_report_page(
        &self,
        admin_id: &str,
        date: &str,
        cursor: Option<&str>,
    ) -> PortResult<ReportPage>;
}
