//! Utility functions shared across the crate.

use std::path::PathBuf;

use crate::cache::DiskCache;
use crate::config::CacheConfig;
use crate::error::Result;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get the user's cache directory following XDG conventions.
///
/// Returns `$XDG_CACHE_HOME` if set, otherwise `$HOME/.cache`.
pub fn cache_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
}

/// Root of everything pdf-reflow keeps under the cache directory.
pub fn app_cache_dir() -> PathBuf {
    cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("pdf-reflow")
}

/// Get the default translated-unit cache path.
pub fn translation_cache_path() -> PathBuf {
    app_cache_dir().join("translations")
}

/// Default directory for temporary upload slots.
pub fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("pdf-reflow-uploads")
}

/// Clear the translated-unit cache on disk at the location `config` resolves to.
///
/// Returns the number of entries cleared.
pub fn clear_translation_cache(config: &CacheConfig) -> Result<usize> {
    let cache_path = config.resolved_disk_path();

    if !cache_path.exists() {
        return Ok(0);
    }

    let cache = DiskCache::new(&cache_path)?;
    let count = cache.len();
    cache.clear()?;

    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_uses_configured_disk_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            disk_enabled: true,
            disk_path: Some(dir.path().join("units")),
            ..CacheConfig::default()
        };

        {
            let cache = DiskCache::new(config.resolved_disk_path()).unwrap();
            cache.insert("a", "eins").unwrap();
            cache.insert("b", "zwei").unwrap();
        }

        assert_eq!(clear_translation_cache(&config).unwrap(), 2);
        assert!(DiskCache::new(config.resolved_disk_path()).unwrap().is_empty());
    }

    #[test]
    fn test_clear_missing_cache_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            disk_path: Some(dir.path().join("never-created")),
            ..CacheConfig::default()
        };

        assert_eq!(clear_translation_cache(&config).unwrap(), 0);
        assert!(!dir.path().join("never-created").exists());
    }
}
