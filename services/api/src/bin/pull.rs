//! services/api/src/bin/pull.rs
//!
//! A terminal client that drives the progressive loader against a running
//! `api` instance: it pages through the report, printing rows in 20-row
//! batches as they arrive, then a final summary.
//!
//! Usage: `pull <admin_id> <YYYY-MM-DD> [base_url]`
//! The service key, if the server requires one, comes from `API_KEY`.

use api_lib::adapters::ReportClient;
use api_lib::error::ApiError;
use convaudit_core::domain::ReportRow;
use convaudit_core::loader::ProgressiveLoader;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(admin_id), Some(date)) = (args.next(), args.next()) else {
        eprintln!("usage: pull <admin_id> <YYYY-MM-DD> [base_url]");
        std::process::exit(2);
    };
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());

    let client = ReportClient::new(base_url, api_key, Duration::from_secs(90))?;
    let mut loader = ProgressiveLoader::new();

    let mut rendered = 0usize;
    let summary = loader
        .load_all(&client, &admin_id, &date, |batch| {
            render_batch(batch, &mut rendered);
        })
        .await?;

    println!();
    println!(
        "{} conversations, {} participation parts, {} processed, {} errors, {} pages",
        summary.row_count,
        summary.participation_count,
        summary.processed_count,
        summary.error_count,
        summary.pages_fetched,
    );
    if summary.capped {
        println!("warning: stopped at the page-iteration cap; results may be incomplete");
    }

    Ok(())
}

fn render_batch(batch: &[ReportRow], rendered: &mut usize) {
    for row in batch {
        *rendered += 1;
        println!(
            "{:>4}  {}  {}  parts={}  {}",
            rendered,
            row.id,
            row.updated_at_iso,
            row.participation_part_count,
            row.subject.as_deref().unwrap_or("-"),
        );
    }
}
