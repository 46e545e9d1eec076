use thiserror::Error;

/// Unified error type for pdf-reflow-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Text extraction (unparseable or unreadable documents)
/// - Model resolution and loading (unsupported languages, missing weights)
/// - Unit translation (forward pass failures)
/// - Rendering and saving of the reflowed document
/// - Cache, configuration and I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Extraction Errors
    // ==========================================================================
    /// The byte sequence is not a parseable PDF, or a page could not be read
    #[error("failed to extract text: {0}")]
    Extraction(String),

    // ==========================================================================
    // Model Errors
    // ==========================================================================
    /// The language code is outside the deployment's supported set.
    ///
    /// This is the model-not-found outcome for a code with no configured
    /// pretrained model. It is raised before the upload is stored or any model
    /// file is touched; [`Error::ModelNotFound`] covers supported languages
    /// whose files cannot be fetched. Both count as [`Error::is_language_error`].
    #[error("unsupported target language '{lang}' (supported: {supported})")]
    UnsupportedLanguage { lang: String, supported: String },

    /// No pretrained model could be fetched for the language pair
    #[error("no pretrained model '{model}' for target language '{lang}': {reason}")]
    ModelNotFound {
        lang: String,
        model: String,
        reason: String,
    },

    /// Model files exist but could not be turned into a working engine
    #[error("failed to load translation model '{model}': {reason}")]
    EngineLoad { model: String, reason: String },

    /// Tokenizer failed to encode or decode a unit
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The model forward pass or decoding loop failed
    #[error("model inference failed: {0}")]
    Inference(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// A unit failed during the model forward pass
    #[error("translation failed for paragraph {paragraph}: {reason}")]
    TranslationUnit { paragraph: usize, reason: String },

    // ==========================================================================
    // Rendering Errors
    // ==========================================================================
    /// A single line could not be laid out (recovered by the renderer)
    #[error("cannot render line: {0}")]
    RenderLine(String),

    /// Failed to load or parse the configured TrueType font
    #[error("failed to load font: {0}")]
    Font(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Rebuild an owned error from one shared between concurrent engine loads.
    ///
    /// Model resolution errors keep their variant so callers can still tell an
    /// unsupported language apart from a broken model.
    pub(crate) fn from_shared(shared: std::sync::Arc<Self>) -> Self {
        match std::sync::Arc::try_unwrap(shared) {
            Ok(err) => err,
            Err(shared) => match shared.as_ref() {
                Self::UnsupportedLanguage { lang, supported } => Self::UnsupportedLanguage {
                    lang: lang.clone(),
                    supported: supported.clone(),
                },
                Self::ModelNotFound {
                    lang,
                    model,
                    reason,
                } => Self::ModelNotFound {
                    lang: lang.clone(),
                    model: model.clone(),
                    reason: reason.clone(),
                },
                Self::EngineLoad { model, reason } => Self::EngineLoad {
                    model: model.clone(),
                    reason: reason.clone(),
                },
                other => Self::EngineLoad {
                    model: String::from("unknown"),
                    reason: other.to_string(),
                },
            },
        }
    }

    /// Whether the error means the requested language cannot be served at all.
    pub const fn is_language_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLanguage { .. } | Self::ModelNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_from_shared_keeps_model_not_found() {
        let shared = Arc::new(Error::ModelNotFound {
            lang: "xx".to_string(),
            model: "Helsinki-NLP/opus-mt-en-xx".to_string(),
            reason: "404".to_string(),
        });
        let _second_holder = Arc::clone(&shared);

        let err = Error::from_shared(shared);
        assert!(matches!(err, Error::ModelNotFound { ref lang, .. } if lang == "xx"));
        assert!(err.is_language_error());
    }

    #[test]
    fn test_unsupported_language_is_a_missing_model_outcome() {
        let err = Error::UnsupportedLanguage {
            lang: "xx".to_string(),
            supported: "de, fr".to_string(),
        };
        assert!(err.is_language_error());
        assert!(!Error::Inference("nan".to_string()).is_language_error());
    }

    #[test]
    fn test_from_shared_unwraps_sole_owner() {
        let err = Error::from_shared(Arc::new(Error::Tokenizer("bad".to_string())));
        assert!(matches!(err, Error::Tokenizer(_)));
    }
}
