//! Observability and Metrics
//!
//! Counters for dispatch activity: frames handled, codec work saved by the
//! parse cache, hook outcomes, and registry churn.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for the dispatch core.
#[derive(Debug)]
pub struct Metrics {
    /// Frames run through the handler pipeline
    pub frames_handled: AtomicU64,
    /// Frames that originated from `write` rather than the wire
    pub frames_fake: AtomicU64,
    /// Frames suppressed by a hook
    pub frames_silenced: AtomicU64,
    /// Frames whose bytes were modified by at least one hook
    pub frames_modified: AtomicU64,
    /// Codec parse invocations
    pub parses: AtomicU64,
    /// Structured events served from the per-invocation cache
    pub parse_cache_hits: AtomicU64,
    /// Hook callbacks invoked
    pub hooks_invoked: AtomicU64,
    /// Structured hooks that committed a rewrite
    pub commits: AtomicU64,
    /// Callbacks that panicked or whose codec round-trip failed
    pub callback_failures: AtomicU64,
    /// Hooks currently registered
    pub hooks_active: AtomicU64,
    /// Modules currently loaded
    pub modules_loaded: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_handled: AtomicU64::new(0),
            frames_fake: AtomicU64::new(0),
            frames_silenced: AtomicU64::new(0),
            frames_modified: AtomicU64::new(0),
            parses: AtomicU64::new(0),
            parse_cache_hits: AtomicU64::new(0),
            hooks_invoked: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            hooks_active: AtomicU64::new(0),
            modules_loaded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn frame_handled(&self, fake: bool) {
        self.frames_handled.fetch_add(1, Ordering::Relaxed);
        if fake {
            self.frames_fake.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn frame_silenced(&self) {
        self.frames_silenced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_modified(&self) {
        self.frames_modified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse(&self) {
        self.parses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_cache_hit(&self) {
        self.parse_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hook_invoked(&self) {
        self.hooks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hook_registered(&self) {
        self.hooks_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hook_removed(&self) {
        self.hooks_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn module_loaded(&self) {
        self.modules_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn module_unloaded(&self) {
        self.modules_loaded.fetch_sub(1, Ordering::Relaxed);
    }

    /// Capture a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_handled: self.frames_handled.load(Ordering::Relaxed),
            frames_fake: self.frames_fake.load(Ordering::Relaxed),
            frames_silenced: self.frames_silenced.load(Ordering::Relaxed),
            frames_modified: self.frames_modified.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
            parse_cache_hits: self.parse_cache_hits.load(Ordering::Relaxed),
            hooks_invoked: self.hooks_invoked.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            hooks_active: self.hooks_active.load(Ordering::Relaxed),
            modules_loaded: self.modules_loaded.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log a one-line summary at info level.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            frames = s.frames_handled,
            silenced = s.frames_silenced,
            modified = s.frames_modified,
            parses = s.parses,
            cache_hits = s.parse_cache_hits,
            failures = s.callback_failures,
            hooks = s.hooks_active,
            modules = s.modules_loaded,
            uptime_secs = s.uptime_secs,
            "dispatch metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the metrics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_handled: u64,
    pub frames_fake: u64,
    pub frames_silenced: u64,
    pub frames_modified: u64,
    pub parses: u64,
    pub parse_cache_hits: u64,
    pub hooks_invoked: u64,
    pub commits: u64,
    pub callback_failures: u64,
    pub hooks_active: u64,
    pub modules_loaded: u64,
    pub uptime_secs: u64,
}
