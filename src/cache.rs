//! Memoization caches for pure parse/compile steps
//!
//! - source description URL parsing
//! - regex criteria compilation
//! - JSONPath criteria syntax checks
//!
//! Clearing a cache never changes validation results, only how much work a
//! repeated validation does. Reads hand out clones so cached entries cannot be
//! mutated through a returned value.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::criterion::jsonpath;

/// Base used to resolve relative URL references (`./petstore.yaml`)
static RELATIVE_BASE: Lazy<Url> = Lazy::new(|| Url::parse("file:///").unwrap());

/// Entry counts per cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub urls: usize,
    pub regexes: usize,
    pub jsonpaths: usize,
}

/// Thread-safe parse caches shared by validation passes
#[derive(Debug, Default)]
pub struct Caches {
    urls: DashMap<String, Result<Url, String>>,
    regexes: DashMap<String, Result<Regex, String>>,
    jsonpaths: DashMap<String, Result<(), String>>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an absolute URL or a relative URL reference
    pub fn parse_url(&self, raw: &str) -> Result<Url, String> {
        if let Some(cached) = self.urls.get(raw) {
            return cached.value().clone();
        }

        let parsed = match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                RELATIVE_BASE.join(raw).map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        self.urls.insert(raw.to_string(), parsed.clone());
        parsed
    }

    /// Compile a regex criterion condition
    pub fn compile_regex(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(cached) = self.regexes.get(pattern) {
            return cached.value().clone();
        }

        let compiled = Regex::new(pattern).map_err(|e| e.to_string());
        self.regexes.insert(pattern.to_string(), compiled.clone());
        compiled
    }

    /// Check JSONPath syntax of a jsonpath criterion condition
    pub fn check_jsonpath(&self, path: &str) -> Result<(), String> {
        if let Some(cached) = self.jsonpaths.get(path) {
            return cached.value().clone();
        }

        let checked = jsonpath::validate(path).map_err(|e| e.to_string());
        self.jsonpaths.insert(path.to_string(), checked.clone());
        checked
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            urls: self.urls.len(),
            regexes: self.regexes.len(),
            jsonpaths: self.jsonpaths.len(),
        }
    }

    pub fn clear(&self) {
        debug!(stats = ?self.stats(), "clearing parse caches");
        self.urls.clear();
        self.regexes.clear();
        self.jsonpaths.clear();
    }
}

/// Process-wide default instance, used when no cache is injected
pub static DEFAULT_CACHES: Lazy<Caches> = Lazy::new(Caches::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_absolute_and_relative() {
        let caches = Caches::new();
        assert!(caches.parse_url("https://petstore.example.com/openapi.yaml").is_ok());
        assert!(caches.parse_url("./openapi.yaml").is_ok());
        assert!(caches.parse_url("http://[::1").is_err());
        assert_eq!(caches.stats().urls, 3);
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let caches = Caches::new();
        let first = caches.compile_regex("^2\\d\\d$").unwrap();
        let second = caches.compile_regex("^2\\d\\d$").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(caches.stats().regexes, 1);
    }

    #[test]
    fn errors_are_cached_too() {
        let caches = Caches::new();
        assert!(caches.compile_regex("[invalid").is_err());
        assert!(caches.check_jsonpath("$[invalid jsonpath").is_err());
        assert!(caches.compile_regex("[invalid").is_err());
        assert_eq!(
            caches.stats(),
            CacheStats {
                urls: 0,
                regexes: 1,
                jsonpaths: 1
            }
        );
    }

    #[test]
    fn clear_empties_every_cache() {
        let caches = Caches::new();
        caches.parse_url("https://example.com").unwrap();
        caches.compile_regex("a+").unwrap();
        caches.check_jsonpath("$.a").unwrap();
        caches.clear();
        assert_eq!(caches.stats(), CacheStats::default());
    }
}
