//! services/api/src/web/rest.rs
//!
//! Contains the Axum handler for the report endpoint and the master
//! definition for the OpenAPI specification.

use crate::web::pipeline::run_report;
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use convaudit_core::domain::{ReportPage, SearchWindow};
use convaudit_core::ports::PortError;
use convaudit_core::wire::normalize_admin_id;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        conversations_handler,
    ),
    components(
        schemas(ErrorBody)
    ),
    tags(
        (name = "Participation API", description = "Endpoints for the conversation participation report.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The body sent with every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: String,
}

/// Query parameters accepted by the report endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub endpoint: Option<String>,
    pub admin_id: Option<String>,
    /// Calendar date, `YYYY-MM-DD`, mapped to a full UTC day.
    pub updated_date: Option<String>,
    /// Alternative window bounds; each accepts epoch seconds or `YYYY-MM-DD`.
    pub updated_since: Option<String>,
    pub updated_before: Option<String>,
    pub starting_after: Option<String>,
}

//=========================================================================================
// REST API Handler
//=========================================================================================

/// Runs the participation report for one admin and one window.
///
/// Dispatches on `endpoint=conversations`; the parameter is kept for wire
/// compatibility with the proxy-function deployment this service replaces.
#[utoipa::path(
    get,
    path = "/api",
    params(
        ("endpoint" = String, Query, description = "Must be `conversations`."),
        ("admin_id" = String, Query, description = "The admin whose participation is reported."),
        ("updated_date" = Option<String>, Query, description = "Calendar date (YYYY-MM-DD), expanded to a full UTC day."),
        ("updated_since" = Option<String>, Query, description = "Window start, epoch seconds or YYYY-MM-DD."),
        ("updated_before" = Option<String>, Query, description = "Window end, epoch seconds or YYYY-MM-DD."),
        ("starting_after" = Option<String>, Query, description = "Continuation cursor from a previous page."),
    ),
    responses(
        (status = 200, description = "One page of verified conversations with participation counts"),
        (status = 400, description = "Missing or malformed query parameters", body = ErrorBody),
        (status = 401, description = "Missing or mismatched service key"),
        (status = 500, description = "Upstream or internal failure", body = ErrorBody)
    )
)]
pub async fn conversations_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportPage>, (StatusCode, Json<ErrorBody>)> {
    if query.endpoint.as_deref() != Some("conversations") {
        return Err(bad_request("unknown endpoint"));
    }

    let window = resolve_window(&query).map_err(bad_request)?;

    match run_report(
        app_state.source.as_ref(),
        &window,
        query.starting_after.as_deref(),
        &app_state.settings,
    )
    .await
    {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            error!(admin_id = %window.admin_id, error = %e, "Report pipeline failed.");
            Err(error_response(e))
        }
    }
}

/// Derives the search window from the query parameters.
fn resolve_window(query: &ReportQuery) -> Result<SearchWindow, &'static str> {
    let admin_id = query
        .admin_id
        .as_deref()
        .map(normalize_admin_id)
        .filter(|id| !id.is_empty())
        .ok_or("admin_id is required")?;

    if let Some(date_str) = &query.updated_date {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| "updated_date must be YYYY-MM-DD")?;
        return Ok(SearchWindow::for_date(admin_id, date));
    }

    match (&query.updated_since, &query.updated_before) {
        (Some(since_str), Some(before_str)) => {
            let since = parse_bound(since_str, false).ok_or("updated_since is not a valid timestamp or date")?;
            let before = parse_bound(before_str, true).ok_or("updated_before is not a valid timestamp or date")?;
            SearchWindow::new(admin_id, since, before)
                .ok_or("updated_since must be earlier than updated_before")
        }
        _ => Err("updated_date or updated_since/updated_before is required"),
    }
}

/// Parses a window bound given as epoch seconds or as a calendar date. A date
/// maps to the start of its UTC day, or its last second when it is the upper
/// bound.
fn parse_bound(raw: &str, is_upper: bool) -> Option<i64> {
    if let Ok(ts) = raw.parse::<i64>() {
        return Some(convaudit_core::normalize_epoch_seconds(ts));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let window = SearchWindow::for_date("_", date);
    Some(if is_upper { window.before } else { window.since })
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Maps a pipeline failure onto an HTTP response, surfacing the upstream
/// status code where feasible.
fn error_response(error: PortError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        PortError::Upstream { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    // Never hand a 2xx/3xx upstream code to the client as an error status.
    let status = if status.is_client_error() || status.is_server_error() {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
}

/// Liveness probe.
pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
