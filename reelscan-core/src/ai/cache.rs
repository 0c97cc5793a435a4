//! Disk-based AI response cache.
//!
//! Only successful response bodies are stored. A request is identified by the
//! hash of its full payload, so a different image, prompt or model never hits
//! an old entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Disk-based AI response cache.
#[derive(Debug, Clone)]
pub struct AiCache {
    cache_dir: PathBuf,
}

/// A cached response body with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAiResponse {
    pub body: String,
    pub cached_at: DateTime<Utc>,
    pub model: String,
}

/// Cache key components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub prompt_name: String,
    pub model: String,
    pub input_hash: String,
}

impl CacheKey {
    pub fn new(prompt_name: &str, model: &str, payload: &JsonValue) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload.to_string().as_bytes());
        let input_hash = hex::encode(hasher.finalize());

        Self {
            prompt_name: prompt_name.to_string(),
            model: model.to_string(),
            input_hash,
        }
    }

    /// Convert to a filesystem path relative to the cache directory.
    ///
    /// Format: {prompt_name}/{model_safe}/{hash[0:2]}/{hash}.json
    pub fn to_path(&self) -> PathBuf {
        // "models/gemini-2.5-flash" -> "models--gemini-2.5-flash"
        let model_safe = self.model.replace(['/', ':'], "--");

        PathBuf::new()
            .join(&self.prompt_name)
            .join(model_safe)
            .join(&self.input_hash[..2])
            .join(format!("{}.json", &self.input_hash))
    }
}

impl AiCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get a cached response if it exists and is readable.
    pub fn get(&self, key: &CacheKey) -> Option<CachedAiResponse> {
        let path = self.cache_dir.join(key.to_path());

        if path.exists() {
            let content = fs::read_to_string(&path).ok()?;
            serde_json::from_str(&content).ok()
        } else {
            None
        }
    }

    /// Store a response body in the cache.
    pub fn put(&self, key: &CacheKey, body: &str) -> std::io::Result<()> {
        let path = self.cache_dir.join(key.to_path());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let cached = CachedAiResponse {
            body: body.to_string(),
            cached_at: Utc::now(),
            model: key.model.clone(),
        };

        let json = serde_json::to_string_pretty(&cached)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&path, json)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        if !self.cache_dir.exists() {
            return stats;
        }

        fn count_json_files(dir: &Path, count: &mut usize) {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.is_dir() {
                        count_json_files(&path, count);
                    } else if path.extension().is_some_and(|ext| ext == "json") {
                        *count += 1;
                    }
                }
            }
        }

        count_json_files(&self.cache_dir, &mut stats.cached_responses);
        stats
    }

    /// Clear all cached responses.
    pub fn clear(&self) -> std::io::Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub cached_responses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_path() {
        let key = CacheKey::new("identify_movie", "models/gemini-2.5-flash", &json!({"a": 1}));

        let path = key.to_path();
        assert!(path.starts_with("identify_movie/models--gemini-2.5-flash/"));
        assert!(path.to_string_lossy().ends_with(".json"));
        assert_eq!(key.input_hash.len(), 64);
    }

    #[test]
    fn test_different_payloads_different_keys() {
        let a = CacheKey::new("identify_movie", "m", &json!({"image": "a"}));
        let b = CacheKey::new("identify_movie", "m", &json!({"image": "b"}));
        assert_ne!(a.input_hash, b.input_hash);
    }

    #[test]
    fn test_put_get_stats_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = AiCache::new(temp_dir.path().join("ai-cache"));
        let key = CacheKey::new("identify_movie", "m", &json!({"image": "a"}));

        assert!(cache.get(&key).is_none());
        assert_eq!(cache.stats().cached_responses, 0);

        cache.put(&key, r#"{"candidates": []}"#).unwrap();

        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.body, r#"{"candidates": []}"#);
        assert_eq!(cached.model, "m");
        assert_eq!(cache.stats().cached_responses, 1);

        cache.clear().unwrap();
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.stats().cached_responses, 0);
    }
}
