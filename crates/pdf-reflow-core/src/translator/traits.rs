use std::sync::Arc;

use crate::config::Lang;
use crate::error::Result;
use super::registry::ModelSpec;

/// Information about a loaded translation engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    /// Human-readable backend name
    pub name: &'static str,
    /// Model identifier, also used to key the unit cache
    pub model_id: String,
    pub source: Lang,
    pub target: Lang,
}

/// A model bound to one language pair that translates single units.
///
/// Implementations must be safe to share between requests; a unit call
/// never observes state left behind by a previous one.
pub trait TranslationEngine: Send + Sync {
    /// Get information about this engine
    fn info(&self) -> EngineInfo;

    /// Get the model identifier (convenience method)
    fn model_id(&self) -> String {
        self.info().model_id
    }

    /// Translate one paragraph. Embedded newlines are part of the unit.
    fn translate_unit(&self, text: &str) -> Result<String>;
}

/// Turns a resolved model description into a ready engine.
pub trait EngineLoader: Send + Sync {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranslationEngine>>;
}
