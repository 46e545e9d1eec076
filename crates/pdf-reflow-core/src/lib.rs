//! PDF Reflow Core Library
//!
//! This library translates PDF documents locally and reflows the result
//! into newly laid out pages:
//! - Text extraction from uploaded documents (MuPDF)
//! - Paragraph segmentation and per-paragraph translation with MarianMT
//!   models (candle)
//! - Caching of loaded engines, plus optional caching of translated units
//! - Rendering of translated text into a fresh A4 document (lopdf)

pub mod cache;
pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod segment;
pub mod translator;
pub mod upload;
pub mod util;

pub use config::{
    AppConfig, CacheConfig, EngineConfig, FailurePolicy, Lang, LanguageOption, PipelineConfig,
    RenderConfig, language_name, target_languages, DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG,
};
pub use error::{Error, Result};
pub use pdf::{DocumentRenderer, ExtractedText, PdfDocument, RenderReport, TextExtractor, extract_text};
pub use pipeline::{PipelineStats, ProgressFn, TranslatedText, TranslationPipeline};
pub use translator::{
    EngineCache, EngineInfo, EngineLoader, MarianLoader, ModelRegistry, ModelSpec,
    TranslationEngine,
};
pub use cache::{CacheKey, TranslationCache};
pub use upload::UploadSlot;
pub use util::clear_translation_cache;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// High-level document translator that combines all components
pub struct DocumentTranslator {
    pipeline: TranslationPipeline,
    renderer: DocumentRenderer,
    upload_dir: PathBuf,
}

/// Result of one submitted document
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    /// Reflowed, translated PDF
    pub pdf_bytes: Vec<u8>,
    pub report: RenderReport,
    pub stats: PipelineStats,
}

impl DocumentTranslator {
    /// Create a translator that loads MarianMT models on demand.
    ///
    /// Fails when the configuration names no tokenizer source.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Self::with_loader(config, Arc::new(MarianLoader::new(config.engine.clone())))
    }

    /// Create with a custom engine loader
    pub fn with_loader(config: &AppConfig, loader: Arc<dyn EngineLoader>) -> Result<Self> {
        config.validate_fields()?;

        let engines = EngineCache::new(
            ModelRegistry::from_config(config),
            loader,
            config.engine.engine_cache_capacity,
        );
        let cache = TranslationCache::new(&config.cache)?;
        let pipeline = TranslationPipeline::new(Arc::new(engines), config.pipeline.clone())
            .with_cache(Arc::new(cache));

        Ok(Self {
            pipeline,
            renderer: DocumentRenderer::new(&config.render)?,
            upload_dir: config.upload_dir.clone(),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.pipeline.engines().registry()
    }

    /// Translate an uploaded document into `target`.
    pub fn submit(&self, file_bytes: &[u8], target: &Lang) -> Result<TranslatedDocument> {
        self.submit_with_progress(file_bytes, target, None)
    }

    pub fn submit_with_progress(
        &self,
        file_bytes: &[u8],
        target: &Lang,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<TranslatedDocument> {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let _span = info_span!("submit", id = %request_id, lang = %target).entered();

        // Reject unknown languages before touching the disk
        self.registry().resolve(target)?;

        let (text, source_title) = self.extract_upload(&request_id, file_bytes)?;
        info!("Extracted {} characters", text.as_str().len());

        let translated = self
            .pipeline
            .translate_with_progress(text.as_str(), target, progress)?;

        let title = self.renderer.title().or(source_title.as_deref());
        let rendered = self.renderer.render_with_title(&translated.text, title)?;

        if !rendered.report.skipped.is_empty() {
            warn!("{} lines could not be rendered", rendered.report.skipped.len());
        }
        info!(
            "Rendered {} pages ({} bytes)",
            rendered.report.pages,
            rendered.bytes.len()
        );

        Ok(TranslatedDocument {
            pdf_bytes: rendered.bytes,
            report: rendered.report,
            stats: translated.stats,
        })
    }

    /// Store the upload, extract its text, and delete it again.
    fn extract_upload(
        &self,
        request_id: &str,
        file_bytes: &[u8],
    ) -> Result<(ExtractedText, Option<String>)> {
        let slot = UploadSlot::create(&self.upload_dir, request_id, file_bytes)?;

        let extracted = PdfDocument::from_file(slot.path()).and_then(|doc| {
            debug!("Opened upload with {} pages", doc.page_count());
            let text = TextExtractor::new(&doc).extract()?;
            Ok((text, doc.metadata().title.clone()))
        });

        if let Err(e) = slot.release() {
            warn!("Failed to remove upload: {}", e);
        }

        extracted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "en");
        assert!(config.target_languages.contains(&Lang::new("de")));
    }

    /// Config whose model source is an (empty) local directory.
    fn local_config(dir: &std::path::Path, upload_dir: PathBuf) -> AppConfig {
        let mut config = AppConfig {
            cache: CacheConfig::disabled(),
            upload_dir,
            ..AppConfig::default()
        };
        config.engine.models_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn test_new_requires_tokenizer_source() {
        let result = DocumentTranslator::new(&AppConfig::default());
        assert!(matches!(result, Err(Error::ConfigInvalid { .. })));
    }

    #[test]
    fn test_unsupported_language_leaves_no_upload() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config(dir.path(), dir.path().join("uploads"));
        let translator = DocumentTranslator::new(&config).unwrap();

        let err = translator.submit(b"%PDF-1.5", &Lang::new("xx")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
        assert!(!dir.path().join("uploads").exists());
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let config = local_config(dir.path(), uploads.path().to_path_buf());
        let translator = DocumentTranslator::new(&config).unwrap();

        let err = translator.submit(b"not a pdf", &Lang::new("de")).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }
}
