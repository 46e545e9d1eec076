use anyhow::{Context, Result};
use pdf_reflow_core::{AppConfig, DocumentTranslator, language_name, target_languages};
use std::sync::Arc;

use crate::templates::LanguageChoice;

/// Global application state
pub struct AppState {
    /// Shared translator; holds the engine cache for every request
    pub translator: Arc<DocumentTranslator>,
    pub config: AppConfig,
}

impl AppState {
    /// Create state that loads MarianMT models on demand.
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator =
            DocumentTranslator::new(&config).context("Failed to create document translator")?;

        Ok(Self {
            translator: Arc::new(translator),
            config,
        })
    }

    /// Target languages this deployment serves, in configuration order.
    pub fn language_options(&self) -> Vec<LanguageChoice> {
        let known = target_languages();
        self.translator
            .registry()
            .targets()
            .iter()
            .map(|lang| {
                let flag = known
                    .iter()
                    .find(|opt| opt.code == lang.as_str())
                    .map_or("", |opt| opt.flag);
                LanguageChoice {
                    code: lang.to_string(),
                    name: language_name(lang.as_str()).to_string(),
                    flag: flag.to_string(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
impl AppState {
    pub fn with_loader(
        config: AppConfig,
        loader: Arc<dyn pdf_reflow_core::EngineLoader>,
    ) -> Result<Self> {
        let translator = DocumentTranslator::with_loader(&config, loader)
            .context("Failed to create document translator")?;

        Ok(Self {
            translator: Arc::new(translator),
            config,
        })
    }
}
