pub mod middleware;
pub mod pipeline;
pub mod rest;
pub mod state;

// Re-export the pieces the server binary wires together.
pub use middleware::require_key;
pub use pipeline::{run_report, PipelineSettings};
pub use rest::{conversations_handler, health_handler};
