//! URL Resolver
//!
//! Pure reference -> canonical URL mapping, memoized per input.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{is_http_url, Config};

// == URL Resolver ==
/// Resolves raw media references to canonical fetchable URLs.
///
/// Resolution never fails: every branch yields a string, in the worst case
/// the placeholder. Results are memoized for the lifetime of the resolver
/// since the mapping is pure for a fixed configuration.
#[derive(Debug)]
pub struct UrlResolver {
    /// Public base without trailing slash; None if unset or malformed
    public_base: Option<String>,
    /// Fallback for empty and unresolvable references
    placeholder: String,
    /// Legacy/internal storage hosts to rewrite onto the public base
    legacy_pattern: Option<Regex>,
    /// Input -> output memo table
    memo: Mutex<HashMap<String, String>>,
}

impl UrlResolver {
    // == Constructor ==
    /// Creates a resolver.
    ///
    /// A malformed public base is treated as absent, and an invalid legacy
    /// pattern disables legacy rewriting. Both are logged, neither fails.
    pub fn new(
        public_base: Option<&str>,
        placeholder: impl Into<String>,
        legacy_pattern: &str,
    ) -> Self {
        let public_base = match public_base.map(str::trim) {
            Some(base) if is_http_url(base) => Some(base.trim_end_matches('/').to_string()),
            Some(base) if !base.is_empty() => {
                warn!("Ignoring malformed public base URL '{}'", base);
                None
            }
            _ => None,
        };

        let legacy_pattern = match Regex::new(legacy_pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid legacy storage pattern '{}': {}", legacy_pattern, e);
                None
            }
        };

        Self {
            public_base,
            placeholder: placeholder.into(),
            legacy_pattern,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a resolver from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.public_base_url.as_deref(),
            config.placeholder_url.clone(),
            &config.legacy_storage_pattern,
        )
    }

    // == Resolve ==
    /// Maps a raw reference to its canonical URL.
    pub fn resolve(&self, reference: Option<&str>) -> String {
        let raw = match reference {
            Some(r) if !r.trim().is_empty() => r,
            _ => return self.placeholder.clone(),
        };

        if let Some(hit) = self.memo.lock().get(raw) {
            return hit.clone();
        }

        let resolved = self.resolve_uncached(raw.trim());
        debug!("Resolved '{}' -> '{}'", raw, resolved);
        self.memo.lock().insert(raw.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, reference: &str) -> String {
        if let Some(base) = &self.public_base {
            if is_under_base(reference, base) {
                return reference.to_string();
            }
        }

        if self
            .legacy_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(reference))
        {
            let path = reference.split(['?', '#']).next().unwrap_or(reference);
            let name = file_name(path);
            return match &self.public_base {
                Some(base) if !name.is_empty() => format!("{}/{}", base, name),
                _ => self.placeholder.clone(),
            };
        }

        if is_http_url(reference) || reference.starts_with('/') {
            return reference.to_string();
        }

        match &self.public_base {
            Some(base) => format!("{}/{}", base, reference.trim_start_matches("./")),
            None => self.placeholder.clone(),
        }
    }

    // == Memo Management ==
    /// Drops every memoized mapping.
    pub fn clear_memo(&self) {
        self.memo.lock().clear();
    }

    /// Number of memoized mappings.
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn public_base(&self) -> Option<&str> {
        self.public_base.as_deref()
    }
}

fn is_under_base(reference: &str, base: &str) -> bool {
    reference
        .strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Returns the trailing path segment of a URL or path.
pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LEGACY_STORAGE_PATTERN;

    const BASE: &str = "https://cdn.example.com";

    fn resolver(base: Option<&str>) -> UrlResolver {
        UrlResolver::new(base, "/placeholder.svg", DEFAULT_LEGACY_STORAGE_PATTERN)
    }

    #[test]
    fn test_empty_reference_is_placeholder() {
        let r = resolver(Some(BASE));
        assert_eq!(r.resolve(None), "/placeholder.svg");
        assert_eq!(r.resolve(Some("")), "/placeholder.svg");
        assert_eq!(r.resolve(Some("   ")), "/placeholder.svg");
    }

    #[test]
    fn test_bare_filename_joins_base() {
        let r = resolver(Some(BASE));
        assert_eq!(
            r.resolve(Some("photo.jpg")),
            "https://cdn.example.com/photo.jpg"
        );
    }

    #[test]
    fn test_trailing_slash_on_base_is_normalized() {
        let r = resolver(Some("https://cdn.example.com/"));
        assert_eq!(
            r.resolve(Some("photo.jpg")),
            "https://cdn.example.com/photo.jpg"
        );
    }

    #[test]
    fn test_bare_filename_without_base_is_placeholder() {
        let r = resolver(None);
        assert_eq!(r.resolve(Some("photo.jpg")), "/placeholder.svg");
    }

    #[test]
    fn test_malformed_base_is_treated_as_absent() {
        let r = resolver(Some("cdn.example.com"));
        assert!(r.public_base().is_none());
        assert_eq!(r.resolve(Some("photo.jpg")), "/placeholder.svg");
    }

    #[test]
    fn test_canonical_url_unchanged() {
        let r = resolver(Some(BASE));
        let url = "https://cdn.example.com/projects/villa.png";
        assert_eq!(r.resolve(Some(url)), url);
    }

    #[test]
    fn test_legacy_storage_url_rewritten() {
        let r = resolver(Some(BASE));
        assert_eq!(
            r.resolve(Some(
                "https://internal.r2.cloudflarestorage.com/bucket/x/y/file.png"
            )),
            "https://cdn.example.com/file.png"
        );
    }

    #[test]
    fn test_legacy_storage_url_drops_query() {
        let r = resolver(Some(BASE));
        assert_eq!(
            r.resolve(Some(
                "https://acct.r2.cloudflarestorage.com/bucket/file.png?X-Amz-Signature=abc"
            )),
            "https://cdn.example.com/file.png"
        );
    }

    #[test]
    fn test_legacy_storage_url_without_base_is_placeholder() {
        let r = resolver(None);
        assert_eq!(
            r.resolve(Some("https://acct.r2.cloudflarestorage.com/bucket/file.png")),
            "/placeholder.svg"
        );
    }

    #[test]
    fn test_external_and_root_relative_unchanged() {
        let r = resolver(Some(BASE));
        assert_eq!(
            r.resolve(Some("https://images.other.org/a.jpg")),
            "https://images.other.org/a.jpg"
        );
        assert_eq!(r.resolve(Some("http://plain.org/b.jpg")), "http://plain.org/b.jpg");
        assert_eq!(r.resolve(Some("/static/logo.svg")), "/static/logo.svg");
    }

    #[test]
    fn test_lookalike_host_is_not_canonical() {
        let r = resolver(Some(BASE));
        // Shares the base as a string prefix but is a different host
        assert_eq!(
            r.resolve(Some("https://cdn.example.com.evil.org/a.jpg")),
            "https://cdn.example.com.evil.org/a.jpg"
        );
    }

    #[test]
    fn test_invalid_legacy_pattern_disables_rewrite() {
        let r = UrlResolver::new(Some(BASE), "/placeholder.svg", "(unclosed");
        let url = "https://acct.r2.cloudflarestorage.com/bucket/file.png";
        assert_eq!(r.resolve(Some(url)), url);
    }

    #[test]
    fn test_memoization_and_clear() {
        let r = resolver(Some(BASE));
        assert_eq!(r.memo_len(), 0);

        r.resolve(Some("a.jpg"));
        r.resolve(Some("a.jpg"));
        r.resolve(Some("b.jpg"));
        assert_eq!(r.memo_len(), 2);

        r.clear_memo();
        assert_eq!(r.memo_len(), 0);
        assert_eq!(r.resolve(Some("a.jpg")), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("https://cdn.example.com/a/b/c.jpg"), "c.jpg");
        assert_eq!(file_name("c.jpg"), "c.jpg");
        assert_eq!(file_name("https://cdn.example.com/dir/"), "");
    }
}
