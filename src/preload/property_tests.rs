//! Property-Based Tests for Preload Module

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::{self, MediaCache};
use crate::config::DEFAULT_LEGACY_STORAGE_PATTERN;
use crate::fetch::mock::ScriptedFetcher;
use crate::preload::{Preloader, DEFAULT_PRIORITY_LIMIT};
use crate::resolver::UrlResolver;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Whatever fails, every batch ends at exactly 100% with every capped
    // reference attempted once and only the successes marked loaded.
    #[test]
    fn prop_batch_completes_at_100(
        outcomes in prop::collection::vec(any::<bool>(), 0..12),
        priority in any::<bool>(),
    ) {
        let refs: Vec<String> = (0..outcomes.len()).map(|i| format!("p{i}.jpg")).collect();
        let mut fetcher = ScriptedFetcher::new();
        for (i, ok) in outcomes.iter().enumerate() {
            if !ok {
                fetcher = fetcher.failing(&format!("https://cdn.example.com/p{i}.jpg"), 1);
            }
        }
        let fetcher = Arc::new(fetcher);

        let done = tokio_test::block_on(async {
            let resolver = Arc::new(UrlResolver::new(
                Some("https://cdn.example.com"),
                "/placeholder.svg",
                DEFAULT_LEGACY_STORAGE_PATTERN,
            ));
            let cache = cache::shared(MediaCache::new(cache::DEFAULT_TTL));
            let preloader =
                Preloader::new(resolver, cache, fetcher.clone(), DEFAULT_PRIORITY_LIMIT);
            preloader.preload(&refs, priority).wait().await
        });

        let expected_total = if priority {
            refs.len().min(DEFAULT_PRIORITY_LIMIT)
        } else {
            refs.len()
        };
        let expected_loaded = outcomes.iter().take(expected_total).filter(|ok| **ok).count();

        prop_assert_eq!(done.progress, 100);
        prop_assert_eq!(done.total, expected_total);
        prop_assert_eq!(done.attempted, expected_total);
        prop_assert_eq!(done.loaded.len(), expected_loaded);
        prop_assert_eq!(fetcher.calls().len(), expected_total);
    }
}
