//! Image Loader
//!
//! Drives one `LoadMachine` per consumer on a tokio task: fetches, waits
//! out backoff delays, records results in the shared cache and publishes
//! every state change on a watch channel.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::state::{LoadMachine, LoadState, LoadStatus, RetryPolicy, Transition};
use crate::cache::{current_timestamp_ms, CachedMedia, SharedCache};
use crate::fetch::Fetcher;
use crate::resolver::UrlResolver;
use crate::visibility::VisibilityGate;

type Callback = Arc<dyn Fn() + Send + Sync>;

// == Callbacks ==
/// Optional consumer notifications, each fired once per terminal
/// transition. Missing callbacks are no-ops.
#[derive(Clone, Default)]
pub struct LoadCallbacks {
    on_load: Option<Callback>,
    on_error: Option<Callback>,
}

impl LoadCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    fn loaded(&self) {
        if let Some(f) = &self.on_load {
            f();
        }
    }

    fn failed(&self) {
        if let Some(f) = &self.on_error {
            f();
        }
    }
}

impl fmt::Debug for LoadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCallbacks")
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// == Attempt Guard ==
/// Generation check standing in for a consumer's liveness. Detaching bumps
/// the shared generation; completions started under an older one are
/// dropped without touching state.
#[derive(Debug, Clone)]
struct AttemptGuard {
    current: Arc<AtomicU64>,
    started: u64,
}

impl AttemptGuard {
    fn new() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            started: 0,
        }
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.started
    }

    fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
enum Command {
    Retry,
}

// == Load Handle ==
/// A consumer's view of one load. Dropping the handle detaches it.
#[derive(Debug)]
pub struct LoadHandle {
    state: watch::Receiver<LoadState>,
    commands: Option<mpsc::UnboundedSender<Command>>,
    guard: AttemptGuard,
}

impl LoadHandle {
    /// Current state snapshot.
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.state.borrow().status
    }

    /// Another receiver for the same state stream.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }

    /// Waits for the next state change. Returns false once the driver is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Waits until the load is `loaded` or `error`.
    pub async fn wait_terminal(&mut self) -> LoadState {
        let settled = self
            .state
            .wait_for(|s| s.status.is_terminal())
            .await
            .map(|s| s.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Asks for a manual retry. Only accepted once the load has settled;
    /// returns whether the request was sent.
    pub fn retry(&self) -> bool {
        if !self.status().is_terminal() {
            return false;
        }
        match &self.commands {
            Some(tx) => tx.send(Command::Retry).is_ok(),
            None => false,
        }
    }

    /// Detaches the consumer. In-flight fetches are left to finish but
    /// their results are discarded.
    pub fn detach(self) {}
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.guard.invalidate();
    }
}

// == Image Loader ==
/// Starts loads for consumers. Cheap to clone.
#[derive(Clone)]
pub struct ImageLoader {
    resolver: Arc<UrlResolver>,
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl ImageLoader {
    pub fn new(
        resolver: Arc<UrlResolver>,
        cache: SharedCache,
        fetcher: Arc<dyn Fetcher>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            resolver,
            cache,
            fetcher,
            policy,
        }
    }

    pub fn resolver(&self) -> &Arc<UrlResolver> {
        &self.resolver
    }

    /// Starts loading `reference`.
    ///
    /// An empty or unresolvable reference settles in `error` on the
    /// placeholder without a fetch. A live cache entry settles in `loaded` without a fetch.
    /// Otherwise the returned handle starts in `loading`.
    pub async fn load(&self, reference: Option<&str>, callbacks: LoadCallbacks) -> LoadHandle {
        let guard = AttemptGuard::new();

        let url = self.resolver.resolve(reference);
        // Empty and unresolvable references both land on the placeholder,
        // which is shown as-is and never fetched
        if url == self.resolver.placeholder() {
            let machine = LoadMachine::unresolvable(url, self.policy);
            let (_tx, rx) = watch::channel(machine.state().clone());
            debug!("Unresolvable reference {:?}, showing placeholder", reference);
            return LoadHandle {
                state: rx,
                commands: None,
                guard,
            };
        }

        let cached = {
            let mut cache = self.cache.write().await;
            match cache.get(&url) {
                Some(media) if media.is_loaded() => cache.touch(&url),
                _ => false,
            }
        };

        let machine = if cached {
            debug!("Cache hit for {}", url);
            callbacks.loaded();
            LoadMachine::from_cache(url, self.policy)
        } else {
            LoadMachine::new(url, self.policy)
        };

        let (state_tx, state_rx) = watch::channel(machine.state().clone());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let run = LoadRun {
            machine,
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
            state: state_tx,
            commands: cmd_rx,
            guard: guard.clone(),
            callbacks,
        };
        tokio::spawn(run.drive());

        LoadHandle {
            state: state_rx,
            commands: Some(cmd_tx),
            guard,
        }
    }

    /// Waits for `gate` to open, then starts loading as `load` does.
    pub async fn load_when_visible(
        &self,
        reference: Option<&str>,
        gate: &VisibilityGate,
        callbacks: LoadCallbacks,
    ) -> LoadHandle {
        gate.opened().await;
        self.load(reference, callbacks).await
    }
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// == Load Run ==
/// Task-side half of one load.
struct LoadRun {
    machine: LoadMachine,
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    state: watch::Sender<LoadState>,
    commands: mpsc::UnboundedReceiver<Command>,
    guard: AttemptGuard,
    callbacks: LoadCallbacks,
}

impl LoadRun {
    async fn drive(mut self) {
        loop {
            if !self.guard.is_current() {
                return;
            }

            if self.machine.state().status == LoadStatus::Loading {
                if !self.attempt().await {
                    return;
                }
                continue;
            }

            // Settled: wait for a manual retry or for the handle to go away
            match self.commands.recv().await {
                Some(Command::Retry) => {
                    if self.guard.is_current()
                        && self.machine.manual_retry(current_timestamp_ms())
                    {
                        debug!("Manual retry for {}", self.machine.base_url());
                        self.publish();
                    }
                }
                None => return,
            }
        }
    }

    /// Runs one fetch and applies its outcome. Returns false when the
    /// consumer detached and the run should stop.
    async fn attempt(&mut self) -> bool {
        let url = self.machine.state().current_url.clone();
        let outcome = self.fetcher.fetch(&url).await;

        if !self.guard.is_current() {
            debug!("Discarding result for detached load of {}", url);
            return false;
        }

        let transition = match &outcome {
            Ok(_) => self.machine.on_success(),
            Err(_) => self.machine.on_failure(current_timestamp_ms()),
        };

        match transition {
            Transition::Loaded => {
                let base = self.machine.base_url().to_string();
                {
                    let mut cache = self.cache.write().await;
                    let now = cache.now_ms();
                    cache.set(base.clone(), CachedMedia::loaded_at_ms(base.clone(), now));
                }
                if !self.guard.is_current() {
                    return false;
                }
                info!("Loaded {}", base);
                self.publish();
                self.callbacks.loaded();
                true
            }
            Transition::Retry { delay, url: next } => {
                if let Err(e) = &outcome {
                    warn!(
                        "Fetch of {} failed ({}), retry {} in {:?}",
                        url,
                        e,
                        self.machine.state().retry_count,
                        delay
                    );
                }
                self.publish();
                debug!("Next attempt {}", next);
                self.wait(delay).await
            }
            Transition::Failed => {
                let base = self.machine.base_url().to_string();
                {
                    let mut cache = self.cache.write().await;
                    let loaded_elsewhere = cache.peek(&base).is_some_and(|e| e.value.is_loaded());
                    if !loaded_elsewhere {
                        let now = cache.now_ms();
                        cache.set(base.clone(), CachedMedia::failed_at_ms(base.clone(), now));
                    }
                }
                if !self.guard.is_current() {
                    return false;
                }
                warn!("Giving up on {} after {} retries", base, self.machine.state().retry_count);
                self.publish();
                self.callbacks.failed();
                true
            }
            Transition::Ignored => true,
        }
    }

    /// Sleeps out a backoff delay. Retry requests are meaningless while
    /// loading and are dropped; a closed channel means the consumer left.
    async fn wait(&mut self, delay: std::time::Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return self.guard.is_current(),
                cmd = self.commands.recv() => {
                    if cmd.is_none() {
                        return false;
                    }
                }
            }
        }
    }

    fn publish(&self) {
        if self.guard.is_current() {
            self.state.send_replace(self.machine.state().clone());
        }
    }
}
