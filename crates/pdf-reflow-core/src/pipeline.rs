//! Paragraph-by-paragraph translation of extracted text.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TranslationCache};
use crate::config::{FailurePolicy, Lang, PipelineConfig};
use crate::error::{Error, Result};
use crate::segment::{Paragraph, join_paragraphs, segment};
use crate::translator::{EngineCache, TranslationEngine};

/// Progress callback, called with `(done, total)` non-empty paragraphs
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Counters for one translation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Paragraphs in the input, blank ones included
    pub paragraphs: usize,
    /// Units produced by the engine or the cache
    pub translated: usize,
    pub skipped_blank: usize,
    pub cache_hits: usize,
    /// Units kept untranslated under [`FailurePolicy::Passthrough`]
    pub passthrough: usize,
}

/// Translated text plus the counters that produced it
#[derive(Debug, Clone)]
pub struct TranslatedText {
    pub text: String,
    pub stats: PipelineStats,
}

/// Segments text and translates each non-empty paragraph as one unit
pub struct TranslationPipeline {
    engines: Arc<EngineCache>,
    cache: Option<Arc<TranslationCache>>,
    config: PipelineConfig,
}

impl TranslationPipeline {
    pub const fn new(engines: Arc<EngineCache>, config: PipelineConfig) -> Self {
        Self {
            engines,
            cache: None,
            config,
        }
    }

    /// Attach a unit cache; disabled caches are ignored.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TranslationCache>) -> Self {
        self.cache = cache.is_enabled().then_some(cache);
        self
    }

    pub fn engines(&self) -> &EngineCache {
        &self.engines
    }

    /// Translate `text` into `target`.
    pub fn translate(&self, text: &str, target: &Lang) -> Result<TranslatedText> {
        self.translate_with_progress(text, target, None)
    }

    pub fn translate_with_progress(
        &self,
        text: &str,
        target: &Lang,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<TranslatedText> {
        let engine = self.engines.get(target)?;
        self.run(engine.as_ref(), text, progress)
    }

    /// Translate `text` with an already loaded engine.
    pub fn run(
        &self,
        engine: &dyn TranslationEngine,
        text: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<TranslatedText> {
        let model_id = engine.model_id();
        let paragraphs = segment(text);
        let total = paragraphs.iter().filter(|p| !p.is_blank()).count();

        let mut stats = PipelineStats {
            paragraphs: paragraphs.len(),
            ..PipelineStats::default()
        };
        let mut output: Vec<String> = Vec::with_capacity(paragraphs.len());
        let mut done = 0;

        for paragraph in &paragraphs {
            if paragraph.is_blank() {
                stats.skipped_blank += 1;
                continue;
            }

            let key = self
                .cache
                .as_ref()
                .map(|_| CacheKey::new(&model_id, paragraph.text));

            if let (Some(cache), Some(key)) = (&self.cache, &key)
                && let Some(hit) = cache.get(key)
            {
                debug!("Cache hit for paragraph {}", paragraph.index);
                stats.cache_hits += 1;
                stats.translated += 1;
                output.push(hit);
            } else {
                match self.translate_unit(engine, paragraph) {
                    Ok(translated) => {
                        if let (Some(cache), Some(key)) = (&self.cache, &key) {
                            cache.insert(key, &translated);
                        }
                        stats.translated += 1;
                        output.push(translated);
                    }
                    Err(e) if self.config.on_unit_failure == FailurePolicy::Passthrough => {
                        warn!("Keeping paragraph {} untranslated: {}", paragraph.index, e);
                        stats.passthrough += 1;
                        output.push(paragraph.text.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }

            done += 1;
            if let Some(callback) = progress {
                callback(done, total);
            }
        }

        info!(
            "Translated {} of {} paragraphs with {} ({} cached, {} blank)",
            stats.translated, stats.paragraphs, model_id, stats.cache_hits, stats.skipped_blank
        );

        Ok(TranslatedText {
            text: join_paragraphs(&output),
            stats,
        })
    }

    fn translate_unit(&self, engine: &dyn TranslationEngine, paragraph: &Paragraph<'_>) -> Result<String> {
        debug!(
            "Translating paragraph {} ({} chars)",
            paragraph.index,
            paragraph.text.chars().count()
        );

        let mut attempt = 0;
        loop {
            match engine.translate_unit(paragraph.text) {
                Ok(translated) => return Ok(translated),
                Err(e) if attempt < self.config.retry_count => {
                    attempt += 1;
                    warn!(
                        "Paragraph {} failed (attempt {}/{}): {}",
                        paragraph.index,
                        attempt,
                        self.config.retry_count + 1,
                        e
                    );
                }
                Err(e) => {
                    return Err(Error::TranslationUnit {
                        paragraph: paragraph.index,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
