//! Askama templates for the upload page.
//!
//! - `index.html` - Upload form with target language selection, plus an
//!   error banner when a form submission failed

use askama::Template;
use askama_web::WebTemplate;
use pdf_reflow_core::language_name;

/// One entry of the target language dropdown.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LanguageChoice {
    pub code: String,
    pub name: String,
    pub flag: String,
}

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub languages: Vec<LanguageChoice>,
    pub source_name: String,
    pub default_target: String,
    pub error: Option<String>,
}

impl IndexTemplate {
    pub fn new(languages: Vec<LanguageChoice>, source: &str, default_target: &str) -> Self {
        Self {
            languages,
            source_name: language_name(source).to_string(),
            default_target: default_target.to_string(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}
