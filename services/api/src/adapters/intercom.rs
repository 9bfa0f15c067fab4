//! services/api/src/adapters/intercom.rs
//!
//! This module contains the adapter for the upstream customer-support
//! messaging API. It implements the `ConversationSource` port from the
//! `core` crate.

use async_trait::async_trait;
use convaudit_core::domain::{CandidatePage, Conversation, SearchWindow};
use convaudit_core::ports::{ConversationSource, PortError, PortResult};
use convaudit_core::wire;
use std::time::Duration;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ConversationSource` against an Intercom-style
/// REST API.
#[derive(Clone)]
pub struct IntercomSource {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl IntercomSource {
    /// Creates a new `IntercomSource`.
    ///
    /// `request_timeout` is a transport-level ceiling on every call; the
    /// orchestrator additionally applies its own budget-derived deadline per
    /// fetch.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        request_timeout: Duration,
    ) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Builds the discovery query body: a boolean OR of two AND clauses, one
    /// per timestamp field, each also requiring the admin in the
    /// conversation's teammate set.
    ///
    /// The upstream search only offers strict comparison, while the window
    /// is inclusive on both ends. Widening each bound by one second keeps
    /// discovery a superset of what the evaluator can confirm; the boundary
    /// seconds themselves are settled by the exact per-part verification.
    fn search_body(
        window: &SearchWindow,
        cursor: Option<&str>,
        per_page: u32,
    ) -> serde_json::Value {
        let clause_for = |field: &str| {
            serde_json::json!({
                "operator": "AND",
                "value": [
                    {"field": field, "operator": ">", "value": window.since - 1},
                    {"field": field, "operator": "<", "value": window.before + 1},
                    {"field": "teammate_ids", "operator": "=", "value": window.admin_id},
                ]
            })
        };

        let mut pagination = serde_json::json!({"per_page": per_page});
        if let Some(cursor) = cursor {
            pagination["starting_after"] = serde_json::Value::String(cursor.to_string());
        }

        serde_json::json!({
            "query": {
                "operator": "OR",
                "value": [clause_for("created_at"), clause_for("updated_at")],
            },
            "pagination": pagination,
        })
    }

    /// Reads the response, preserving the upstream status and body on any
    /// non-success answer.
    async fn read_json(response: reqwest::Response) -> PortResult<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PortError::Decode(e.to_string()))
    }
}

//=========================================================================================
// `ConversationSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConversationSource for IntercomSource {
    async fn search_conversations(
        &self,
        window: &SearchWindow,
        cursor: Option<&str>,
        per_page: u32,
    ) -> PortResult<CandidatePage> {
        let body = Self::search_body(window, cursor, per_page);
        let response = self
            .client
            .post(format!("{}/conversations/search", self.base_url))
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let json = Self::read_json(response).await?;
        wire::decode_search_response(&json)
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> PortResult<Conversation> {
        // Plaintext rendering keeps participation matching free of markup.
        let response = self
            .client
            .get(format!(
                "{}/conversations/{}",
                self.base_url, conversation_id
            ))
            .query(&[("display_as", "plaintext")])
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let json = Self::read_json(response).await?;
        wire::decode_conversation(&json)
    }
}
