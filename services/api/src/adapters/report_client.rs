//! services/api/src/adapters/report_client.rs
//!
//! This module contains the client-side adapter for this service's own
//! report endpoint. It implements the `ReportPageSource` port and is what
//! the `pull` binary drives the progressive loader with.

use async_trait::async_trait;
use convaudit_core::domain::ReportPage;
use convaudit_core::ports::{PortError, PortResult, ReportPageSource};
use std::time::Duration;

/// An adapter that fetches report pages from a running `api` instance.
#[derive(Clone)]
pub struct ReportClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReportClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ReportPageSource for ReportClient {
    async fn fetch_report_page(
        &self,
        admin_id: &str,
        date: &str,
        cursor: Option<&str>,
    ) -> PortResult<ReportPage> {
        let mut query: Vec<(&str, &str)> = vec![
            ("endpoint", "conversations"),
            ("admin_id", admin_id),
            ("updated_date", date),
        ];
        if let Some(cursor) = cursor {
            query.push(("starting_after", cursor));
        }

        let mut request = self
            .client
            .get(format!("{}/api", self.base_url))
            .query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ReportPage>()
            .await
            .map_err(|e| PortError::Decode(e.to_string()))
    }
}
