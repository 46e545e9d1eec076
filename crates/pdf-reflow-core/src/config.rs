use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language codes as used in opus-mt model names (ISO 639-1 for most pairs)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased, trimmed form used for registry lookups.
    pub fn normalized(&self) -> Self {
        Self(self.0.trim().to_lowercase())
    }
}

// Serde default functions
fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_languages() -> Vec<Lang> {
    target_languages()
        .iter()
        .map(|opt| Lang::new(opt.code))
        .collect()
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where and how translation models are fetched.
///
/// The model identifier is built from `model_template` by substituting
/// `{source}` and `{target}`. Tokenizer file names accept `{lang}`, which
/// is replaced by the source or target code respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_model_template")]
    pub model_template: String,
    #[serde(default = "default_revision")]
    pub revision: String,
    /// Weights file inside the model repository (`.safetensors` or PyTorch `.bin`)
    #[serde(default = "default_weights_file")]
    pub weights_file: String,
    /// Hub repository holding converted tokenizer JSON files. The opus-mt
    /// repositories ship SentencePiece models only, so hub loading needs this.
    #[serde(default)]
    pub tokenizer_repo: Option<String>,
    #[serde(default = "default_tokenizer_file")]
    pub source_tokenizer_file: String,
    #[serde(default = "default_tokenizer_file")]
    pub target_tokenizer_file: String,
    /// Local directory checked before the hub: `<models_dir>/<org>--<name>/`
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// Hub download cache (defaults to the hub client's own cache)
    #[serde(default)]
    pub hub_cache_dir: Option<PathBuf>,
    /// Upper bound on generated tokens per unit
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    /// Use a CUDA device when one is available
    #[serde(default)]
    pub use_gpu: bool,
    /// Loaded engines kept in memory across requests (0 = load per request)
    #[serde(default = "default_engine_cache_capacity")]
    pub engine_cache_capacity: u64,
}

fn default_model_template() -> String {
    "Helsinki-NLP/opus-mt-{source}-{target}".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_weights_file() -> String {
    "model.safetensors".to_string()
}

fn default_tokenizer_file() -> String {
    "tokenizer-marian-base-{lang}.json".to_string()
}

const fn default_max_new_tokens() -> usize {
    512
}

const fn default_engine_cache_capacity() -> u64 {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_template: default_model_template(),
            revision: default_revision(),
            weights_file: default_weights_file(),
            tokenizer_repo: None,
            source_tokenizer_file: default_tokenizer_file(),
            target_tokenizer_file: default_tokenizer_file(),
            models_dir: None,
            hub_cache_dir: None,
            max_new_tokens: default_max_new_tokens(),
            use_gpu: false,
            engine_cache_capacity: default_engine_cache_capacity(),
        }
    }
}

/// What to do when a single paragraph fails to translate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole request
    #[default]
    Abort,
    /// Keep the untranslated paragraph and continue
    Passthrough,
}

/// Translation pipeline behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extra attempts per unit after a failure (0 = no retry)
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub on_unit_failure: FailurePolicy,
}

/// Cache configuration for translated units.
///
/// Both layers are off unless enabled: with the defaults no translated text
/// outlives the request that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default)]
    pub memory_enabled: bool,

    /// Memory cache budget in megabytes
    #[serde(default = "default_memory_max_mb")]
    pub memory_max_mb: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable disk cache
    #[serde(default)]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to .cache/pdf-reflow/translations)
    pub disk_path: Option<PathBuf>,
}

const fn default_memory_max_mb() -> u64 {
    64
}

impl CacheConfig {
    /// Configuration with both layers switched off.
    pub const fn disabled() -> Self {
        Self {
            memory_enabled: false,
            memory_max_mb: 0,
            memory_ttl_seconds: 0,
            disk_enabled: false,
            disk_path: None,
        }
    }
}

impl CacheConfig {
    /// Location of the disk layer, configured or default.
    pub fn resolved_disk_path(&self) -> PathBuf {
        self.disk_path
            .clone()
            .unwrap_or_else(crate::util::translation_cache_path)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: false,
            memory_max_mb: default_memory_max_mb(),
            memory_ttl_seconds: 0,
            disk_enabled: false,
            disk_path: None,
        }
    }
}

/// Output document options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// TrueType font to embed instead of the bundled DejaVu Sans
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    /// Use the standard Helvetica font when no `font_path` is set. Lines with
    /// characters outside Latin-1 are then skipped.
    #[serde(default)]
    pub standard_font: bool,
    /// Document title written to the output's Info dictionary
    #[serde(default)]
    pub title: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language of every document this deployment accepts
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target languages offered to callers
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<Lang>,

    /// Model source and engine options
    #[serde(default)]
    pub engine: EngineConfig,

    /// Translation pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Translated-unit cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Output document options
    #[serde(default)]
    pub render: RenderConfig,

    /// Directory for temporary upload slots
    #[serde(default = "crate::util::default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_languages: default_target_languages(),
            engine: EngineConfig::default(),
            pipeline: PipelineConfig::default(),
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
            upload_dir: crate::util::default_upload_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        // Model sources may still come from command line overrides
        config.validate_fields()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-reflow/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-reflow").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject configurations that cannot load any model.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        self.validate_fields()?;
        self.validate_model_source()
    }

    /// Field checks that hold for any engine loader.
    pub fn validate_fields(&self) -> Result<(), crate::error::Error> {
        if !self.engine.model_template.contains("{target}") {
            return Err(crate::error::Error::ConfigInvalid {
                field: "engine.model_template".to_string(),
                reason: "must contain the {target} placeholder".to_string(),
            });
        }
        if self.target_languages.is_empty() {
            return Err(crate::error::Error::ConfigInvalid {
                field: "target_languages".to_string(),
                reason: "at least one target language is required".to_string(),
            });
        }
        if self.engine.max_new_tokens == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "engine.max_new_tokens".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The opus-mt repositories carry no `tokenizer.json`, so MarianMT
    /// engines need converted tokenizers from `engine.tokenizer_repo` or a
    /// local `engine.models_dir`.
    fn validate_model_source(&self) -> Result<(), crate::error::Error> {
        if self.engine.tokenizer_repo.is_some() {
            return Ok(());
        }
        match &self.engine.models_dir {
            Some(dir) if dir.is_dir() => Ok(()),
            Some(dir) => Err(crate::error::Error::ConfigInvalid {
                field: "engine.models_dir".to_string(),
                reason: format!("{} is not a directory", dir.display()),
            }),
            None => Err(crate::error::Error::ConfigInvalid {
                field: "engine.tokenizer_repo".to_string(),
                reason: "no tokenizer source: set engine.tokenizer_repo to a repository with \
                         converted Marian tokenizers, or engine.models_dir to local model copies"
                    .to_string(),
            }),
        }
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// Language code as used in model names (e.g., "de", "fr", "zh")
    pub code: &'static str,
    /// Display name (e.g., "German", "French")
    pub name: &'static str,
    /// Flag emoji
    pub flag: &'static str,
}

/// Targets with a published opus-mt model from English whose script the
/// bundled font covers without shaping.
pub fn target_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "de", name: "German", flag: "🇩🇪" },
        LanguageOption { code: "fr", name: "French", flag: "🇫🇷" },
        LanguageOption { code: "es", name: "Spanish", flag: "🇪🇸" },
        LanguageOption { code: "it", name: "Italian", flag: "🇮🇹" },
        LanguageOption { code: "nl", name: "Dutch", flag: "🇳🇱" },
        LanguageOption { code: "sv", name: "Swedish", flag: "🇸🇪" },
        LanguageOption { code: "fi", name: "Finnish", flag: "🇫🇮" },
        LanguageOption { code: "da", name: "Danish", flag: "🇩🇰" },
        LanguageOption { code: "ro", name: "Romanian", flag: "🇷🇴" },
        LanguageOption { code: "cs", name: "Czech", flag: "🇨🇿" },
        LanguageOption { code: "ru", name: "Russian", flag: "🇷🇺" },
        LanguageOption { code: "uk", name: "Ukrainian", flag: "🇺🇦" },
    ]
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "en";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "de";

/// Get display name for a language code, falling back to the code itself.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        other => target_languages()
            .into_iter()
            .find(|opt| opt.code == other)
            .map_or(other, |opt| opt.name),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_fields_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "en");
        assert!(config.target_languages.contains(&Lang::new("de")));
        assert!(config.validate_fields().is_ok());
    }

    #[test]
    fn test_default_config_persists_nothing() {
        let config = AppConfig::default();
        assert!(!config.cache.disk_enabled);
        assert!(!config.cache.memory_enabled);
    }

    #[test]
    fn test_missing_tokenizer_source_is_rejected() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::ConfigInvalid { ref field, .. } if field == "engine.tokenizer_repo"
        ));
    }

    #[test]
    fn test_tokenizer_repo_or_models_dir_is_accepted() {
        let mut config = AppConfig::default();
        config.engine.tokenizer_repo = Some("org/marian-tokenizers".to_string());
        assert!(config.validate().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.engine.models_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());

        config.engine.models_dir = Some(dir.path().join("missing"));
        assert!(matches!(
            config.validate(),
            Err(crate::error::Error::ConfigInvalid { ref field, .. }) if field == "engine.models_dir"
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            target_languages = ["fr", "es"]

            [engine]
            revision = "refs/pr/4"
            engine_cache_capacity = 0

            [pipeline]
            on_unit_failure = "passthrough"
            "#,
        )
        .unwrap();

        assert_eq!(config.target_languages, vec![Lang::new("fr"), Lang::new("es")]);
        assert_eq!(config.engine.revision, "refs/pr/4");
        assert_eq!(config.engine.engine_cache_capacity, 0);
        assert_eq!(config.engine.weights_file, "model.safetensors");
        assert_eq!(config.pipeline.on_unit_failure, FailurePolicy::Passthrough);
        assert!(!config.cache.memory_enabled);
        assert!(!config.render.standard_font);
    }

    #[test]
    fn test_template_without_target_is_rejected() {
        let mut config = AppConfig::default();
        config.engine.model_template = "Helsinki-NLP/opus-mt-en-de".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("de"), "German");
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn test_lang_normalized() {
        assert_eq!(Lang::new(" DE ").normalized(), Lang::new("de"));
    }
}
