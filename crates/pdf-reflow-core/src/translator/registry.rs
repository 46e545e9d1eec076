use crate::config::{AppConfig, EngineConfig, Lang};
use crate::error::{Error, Result};

/// Everything needed to fetch the model for one language pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub source: Lang,
    pub target: Lang,
    /// Repository identifier, e.g. `Helsinki-NLP/opus-mt-en-de`
    pub model_id: String,
    pub revision: String,
    pub weights_file: String,
    /// Repository holding the tokenizer files
    pub tokenizer_repo: String,
    pub source_tokenizer_file: String,
    pub target_tokenizer_file: String,
}

/// Maps target language codes to model identifiers for a fixed source language.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    source: Lang,
    targets: Vec<Lang>,
    engine: EngineConfig,
}

impl ModelRegistry {
    pub fn new(source: Lang, targets: Vec<Lang>, engine: EngineConfig) -> Self {
        Self {
            source: source.normalized(),
            targets: targets.iter().map(Lang::normalized).collect(),
            engine,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.source_lang.clone(),
            config.target_languages.clone(),
            config.engine.clone(),
        )
    }

    pub const fn source(&self) -> &Lang {
        &self.source
    }

    pub fn targets(&self) -> &[Lang] {
        &self.targets
    }

    pub fn supports(&self, target: &Lang) -> bool {
        self.targets.contains(&target.normalized())
    }

    /// Model identifier for `target`, without checking support.
    pub fn model_id(&self, target: &Lang) -> String {
        self.engine
            .model_template
            .replace("{source}", self.source.as_str())
            .replace("{target}", target.normalized().as_str())
    }

    /// Resolve `target` to a model description.
    ///
    /// Fails with [`Error::UnsupportedLanguage`], the missing-model outcome,
    /// for codes outside the configured set; no files are touched.
    pub fn resolve(&self, target: &Lang) -> Result<ModelSpec> {
        let target = target.normalized();
        if !self.targets.contains(&target) {
            return Err(Error::UnsupportedLanguage {
                lang: target.to_string(),
                supported: self
                    .targets
                    .iter()
                    .map(Lang::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let model_id = self.model_id(&target);
        let tokenizer_repo = self
            .engine
            .tokenizer_repo
            .clone()
            .unwrap_or_else(|| model_id.clone());

        Ok(ModelSpec {
            source_tokenizer_file: self
                .engine
                .source_tokenizer_file
                .replace("{lang}", self.source.as_str()),
            target_tokenizer_file: self
                .engine
                .target_tokenizer_file
                .replace("{lang}", target.as_str()),
            source: self.source.clone(),
            target,
            model_id,
            revision: self.engine.revision.clone(),
            weights_file: self.engine.weights_file.clone(),
            tokenizer_repo,
        })
    }
}
