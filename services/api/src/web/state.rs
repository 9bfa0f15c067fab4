//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::pipeline::PipelineSettings;
use convaudit_core::ports::ConversationSource;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ConversationSource>,
    pub config: Arc<Config>,
    pub settings: PipelineSettings,
}

impl AppState {
    pub fn new(source: Arc<dyn ConversationSource>, config: Arc<Config>) -> Self {
        let settings = PipelineSettings::from_config(&config);
        Self {
            source,
            config,
            settings,
        }
    }
}
