//! Page routes - upload form, language list and health check.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::state::AppState;
use crate::templates::{IndexTemplate, LanguageChoice};

/// Landing page with upload form.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate::new(
        state.language_options(),
        state.config.source_lang.as_str(),
        pdf_reflow_core::DEFAULT_TARGET_LANG,
    )
}

/// Supported target languages as JSON.
pub async fn languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageChoice>> {
    Json(state.language_options())
}

pub async fn health() -> &'static str {
    "ok"
}
