//! services/api/src/bin/openapi.rs
//!
//! Dumps the service's OpenAPI 3.0 specification to disk, for consumers
//! that want the schema without a running server.
//!
//! Usage: `openapi [output-path]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let spec = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec)?;
    println!("wrote OpenAPI specification to {path}");
    Ok(())
}
