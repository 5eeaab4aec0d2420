// Language detection and translation capabilities.
//
// Both are total: detection defaults to "en" and translation returns its
// input on any failure, so the pipeline never stalls on a missing or broken
// translation backend. The translator owns a bounded LRU cache keyed by a
// content hash, so repeated requests for the same text cost one API call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::traits::{LanguageDetector, Translator};

const TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded cache size; the oldest-used entry is evicted beyond this.
pub const TRANSLATION_CACHE_CAPACITY: usize = 200;

/// Inputs under 3 chars are passed through untouched by both capabilities.
const MIN_DETECTABLE_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Translation cache
// ---------------------------------------------------------------------------

fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Capacity-bounded LRU map. An access refreshes recency, so hot entries
/// survive eviction. Owned by the translator instance, not process-global,
/// which keeps it resettable between tests.
pub struct TranslationCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, text: &str) -> Option<String> {
        let key = content_key(text);
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let value = inner.entries.get(&key).cloned()?;
        // Refresh recency
        inner.order.retain(|k| k != &key);
        inner.order.push_back(key);
        Some(value)
    }

    pub fn insert(&self, text: &str, translation: String) {
        let key = content_key(text);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(key.clone(), translation);
        inner.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
        inner.order.clear();
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(TRANSLATION_CACHE_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Google Translate adapters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslationEntry>,
}

#[derive(Debug, Deserialize)]
struct TranslationEntry {
    #[serde(rename = "translatedText", default)]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    data: DetectData,
}

#[derive(Debug, Deserialize)]
struct DetectData {
    #[serde(default)]
    detections: Vec<Vec<DetectionEntry>>,
}

#[derive(Debug, Deserialize)]
struct DetectionEntry {
    #[serde(default)]
    language: String,
}

pub struct GoogleTranslator {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    cache: TranslationCache,
}

impl GoogleTranslator {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(TRANSLATE_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: TRANSLATE_URL.to_string(),
            cache: TranslationCache::default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    async fn call_translate(&self, text: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", text),
                ("target", "en"),
                ("format", "text"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("translate API returned {status}");
        }

        let data: TranslateResponse = response.json().await?;
        let translated = data
            .data
            .translations
            .first()
            .map(|t| t.translated_text.clone())
            .unwrap_or_default();

        if translated.trim().is_empty() {
            anyhow::bail!("translate API returned empty text");
        }
        Ok(translated)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate_to_english(&self, text: &str) -> String {
        if self.api_key.is_empty() || text.trim().len() < MIN_DETECTABLE_LEN {
            return text.to_string();
        }

        if let Some(cached) = self.cache.get(text) {
            debug!("Translation cache hit");
            return cached;
        }

        match self.call_translate(text).await {
            Ok(translated) => {
                self.cache.insert(text, translated.clone());
                translated
            }
            Err(e) => {
                warn!(error = %e, "Translation failed, returning original text");
                text.to_string()
            }
        }
    }
}

pub struct GoogleLanguageDetector {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleLanguageDetector {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(TRANSLATE_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: format!("{TRANSLATE_URL}/detect"),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn call_detect(&self, text: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", text)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("detect API returned {status}");
        }

        let data: DetectResponse = response.json().await?;
        let language = data
            .data
            .detections
            .first()
            .and_then(|d| d.first())
            .map(|d| d.language.clone())
            .unwrap_or_default();

        if language.is_empty() {
            anyhow::bail!("detect API returned no language");
        }
        Ok(language)
    }
}

#[async_trait]
impl LanguageDetector for GoogleLanguageDetector {
    async fn detect(&self, text: &str) -> String {
        if self.api_key.is_empty() || text.trim().len() < MIN_DETECTABLE_LEN {
            return "en".to_string();
        }

        match self.call_detect(text).await {
            Ok(language) => {
                debug!(language = language.as_str(), "Language detected");
                language
            }
            Err(e) => {
                debug!(error = %e, "Language detection failed, defaulting to en");
                "en".to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// No-op implementations for when translation is not configured
// ---------------------------------------------------------------------------

pub struct NoopDetector;

#[async_trait]
impl LanguageDetector for NoopDetector {
    async fn detect(&self, _text: &str) -> String {
        "en".to_string()
    }
}

pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate_to_english(&self, text: &str) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let cache = TranslationCache::new(10);
        assert!(cache.get("hola").is_none());
        cache.insert("hola", "hello".to_string());
        assert_eq!(cache.get("hola").as_deref(), Some("hello"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let cache = TranslationCache::new(2);
        cache.insert("a", "1".to_string());
        cache.insert("b", "2".to_string());
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.insert("c", "3".to_string());

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_update_refreshes_entry() {
        let cache = TranslationCache::new(2);
        cache.insert("a", "1".to_string());
        cache.insert("b", "2".to_string());
        cache.insert("a", "1-updated".to_string());
        cache.insert("c", "3".to_string());

        // "b" was least recently used after "a" was re-inserted.
        assert_eq!(cache.get("a").as_deref(), Some("1-updated"));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_cache_clear() {
        let cache = TranslationCache::new(4);
        cache.insert("a", "1".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_noop_detector_returns_en() {
        assert_eq!(NoopDetector.detect("bonjour tout le monde").await, "en");
    }

    #[tokio::test]
    async fn test_noop_translator_passthrough() {
        assert_eq!(
            NoopTranslator.translate_to_english("bonjour").await,
            "bonjour"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_translator_passthrough() {
        let translator = GoogleTranslator::new("");
        assert_eq!(translator.translate_to_english("hola mundo").await, "hola mundo");
    }

    #[tokio::test]
    async fn test_short_input_detects_en() {
        let detector = GoogleLanguageDetector::new("key");
        assert_eq!(detector.detect("ab").await, "en");
    }
}
