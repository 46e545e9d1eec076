mod memory;
mod disk;
mod key;

pub use memory::MemoryCache;
pub use disk::DiskCache;
pub use key::CacheKey;

use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined cache of translated units with memory and disk layers
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = config
            .memory_enabled
            .then(|| MemoryCache::new(config.memory_max_mb, config.memory_ttl_seconds));

        let disk = if config.disk_enabled {
            Some(DiskCache::new(config.resolved_disk_path())?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Whether any layer is active
    pub const fn is_enabled(&self) -> bool {
        self.memory.is_some() || self.disk.is_some()
    }

    /// Get a cached translation
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let key_str = key.as_str();

        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(key_str) {
                return Some(value);
            }

        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(key_str) {
                // Populate memory cache on disk hit
                if let Some(ref memory) = self.memory {
                    memory.insert(key_str.to_string(), value.clone());
                }
                return Some(value);
            }

        None
    }

    /// Store a translation in cache
    pub fn insert(&self, key: &CacheKey, value: &str) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.to_string(), value.to_string());
        }

        if let Some(ref disk) = self.disk
            && let Err(e) = disk.insert(key.as_str(), value) {
                warn!("Failed to persist translation {}: {}", key, e);
            }
    }
}
