mod engines;
mod marian;
mod registry;
mod traits;

pub use engines::EngineCache;
pub use marian::{MarianEngine, MarianLoader, ModelFiles};
pub use registry::{ModelRegistry, ModelSpec};
pub use traits::{EngineInfo, EngineLoader, TranslationEngine};
