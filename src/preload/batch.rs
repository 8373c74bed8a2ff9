//! Preload batches.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CachedMedia, SharedCache};
use crate::fetch::Fetcher;
use crate::resolver::{MediaKind, UrlResolver};

/// References fetched up front by a priority preload.
pub const DEFAULT_PRIORITY_LIMIT: usize = 4;

// == Preload Progress ==
/// Snapshot of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadProgress {
    /// Percentage of references attempted, 0..=100
    pub progress: u8,
    pub is_preloading: bool,
    /// References in the batch after any priority cap
    pub total: usize,
    /// References whose attempt finished, successfully or not
    pub attempted: usize,
    /// References confirmed loaded, as given by the caller
    pub loaded: BTreeSet<String>,
}

impl PreloadProgress {
    fn started(total: usize) -> Self {
        Self {
            progress: if total == 0 { 100 } else { 0 },
            is_preloading: total > 0,
            total,
            attempted: 0,
            loaded: BTreeSet::new(),
        }
    }

    fn record(&mut self, reference: &str, loaded: bool) {
        self.attempted += 1;
        if loaded {
            self.loaded.insert(reference.to_string());
        }
        self.progress = (self.attempted * 100 / self.total.max(1)).min(100) as u8;
        self.is_preloading = self.attempted < self.total;
    }
}

// == Preload Handle ==
/// Observer of one batch. Clones observe the same batch.
#[derive(Debug, Clone)]
pub struct PreloadHandle {
    progress: watch::Receiver<PreloadProgress>,
    cancelled: Arc<AtomicBool>,
}

impl PreloadHandle {
    pub fn progress(&self) -> u8 {
        self.progress.borrow().progress
    }

    pub fn is_preloading(&self) -> bool {
        self.progress.borrow().is_preloading
    }

    pub fn is_loaded(&self, reference: &str) -> bool {
        self.progress.borrow().loaded.contains(reference)
    }

    pub fn snapshot(&self) -> PreloadProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PreloadProgress> {
        self.progress.clone()
    }

    /// Waits until every reference has been attempted, or the batch was
    /// superseded, and returns the last snapshot.
    pub async fn wait(&self) -> PreloadProgress {
        let mut rx = self.progress.clone();
        let done = rx.wait_for(|p| !p.is_preloading).await.map(|p| p.clone());
        done.unwrap_or_else(|_| self.snapshot())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct CurrentBatch {
    references: Vec<String>,
    priority: bool,
    handle: PreloadHandle,
}

// == Preloader ==
/// Runs at most one batch at a time per gallery.
pub struct Preloader {
    resolver: Arc<UrlResolver>,
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    priority_limit: usize,
    current: Mutex<Option<CurrentBatch>>,
}

impl Preloader {
    pub fn new(
        resolver: Arc<UrlResolver>,
        cache: SharedCache,
        fetcher: Arc<dyn Fetcher>,
        priority_limit: usize,
    ) -> Self {
        Self {
            resolver,
            cache,
            fetcher,
            priority_limit,
            current: Mutex::new(None),
        }
    }

    /// Preloads `references` one at a time, capped to the first
    /// `priority_limit` when `priority` is set.
    ///
    /// Asking again for the same list returns the running batch. A
    /// different list supersedes it and starts over at 0%.
    pub fn preload(&self, references: &[String], priority: bool) -> PreloadHandle {
        let mut current = self.current.lock();

        if let Some(batch) = current.as_ref() {
            if batch.priority == priority && batch.references == references {
                return batch.handle.clone();
            }
            batch.handle.cancelled.store(true, Ordering::SeqCst);
            debug!("Superseding preload batch of {}", batch.references.len());
        }

        let batch: Vec<String> = if priority {
            references.iter().take(self.priority_limit).cloned().collect()
        } else {
            references.to_vec()
        };

        let (tx, rx) = watch::channel(PreloadProgress::started(batch.len()));
        let handle = PreloadHandle {
            progress: rx,
            cancelled: Arc::new(AtomicBool::new(false)),
        };

        if !batch.is_empty() {
            let run = BatchRun {
                references: batch,
                resolver: self.resolver.clone(),
                cache: self.cache.clone(),
                fetcher: self.fetcher.clone(),
                progress: tx,
                cancelled: handle.cancelled.clone(),
            };
            tokio::spawn(run.drive());
        }

        *current = Some(CurrentBatch {
            references: references.to_vec(),
            priority,
            handle: handle.clone(),
        });
        handle
    }
}

impl fmt::Debug for Preloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preloader")
            .field("priority_limit", &self.priority_limit)
            .finish_non_exhaustive()
    }
}

struct BatchRun {
    references: Vec<String>,
    resolver: Arc<UrlResolver>,
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    progress: watch::Sender<PreloadProgress>,
    cancelled: Arc<AtomicBool>,
}

impl BatchRun {
    async fn drive(self) {
        let total = self.references.len();

        for reference in &self.references {
            if self.cancelled.load(Ordering::SeqCst) {
                debug!("Preload batch superseded, stopping");
                return;
            }

            let loaded = self.preload_one(reference).await;

            if self.cancelled.load(Ordering::SeqCst) {
                return;
            }
            self.progress.send_modify(|p| p.record(reference, loaded));
        }

        let loaded = self.progress.borrow().loaded.len();
        info!("Preloaded {} of {} references", loaded, total);
    }

    async fn preload_one(&self, reference: &str) -> bool {
        if reference.trim().is_empty() {
            return false;
        }
        // Videos are referenced, never prefetched
        if MediaKind::from_reference(reference).is_video() {
            return true;
        }

        let url = self.resolver.resolve(Some(reference));
        if url == self.resolver.placeholder() {
            debug!("Nothing to preload for {:?}", reference);
            return false;
        }
        {
            let mut cache = self.cache.write().await;
            let hit = cache.get(&url).is_some_and(|media| media.is_loaded());
            if hit && cache.touch(&url) {
                return true;
            }
        }

        match self.fetcher.fetch(&url).await {
            Ok(_) => {
                let mut cache = self.cache.write().await;
                let now = cache.now_ms();
                cache.set(url.clone(), CachedMedia::loaded_at_ms(url, now));
                true
            }
            Err(e) => {
                warn!("Preload of {} failed: {}", url, e);
                false
            }
        }
    }
}
