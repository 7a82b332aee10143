//! Logging setup and prefetch counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Prefetch counters
#[derive(Debug, Default)]
pub struct Metrics {
    modules_downloaded: AtomicU64,
    modules_failed: AtomicU64,
    modules_skipped: AtomicU64,
    files_downloaded: AtomicU64,
    files_skipped: AtomicU64,
    optional_fetch_absorbed: AtomicU64,
    invalidations: AtomicU64,
}

macro_rules! counter {
    ($method:ident, $field:ident) => {
        pub fn $method(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(counter = stringify!($field), "Metric incremented");
        }
    };
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(module_downloaded, modules_downloaded);
    counter!(module_failed, modules_failed);
    counter!(module_skipped, modules_skipped);
    counter!(file_downloaded, files_downloaded);
    counter!(file_skipped, files_skipped);
    counter!(optional_fetch_absorbed, optional_fetch_absorbed);
    counter!(invalidation, invalidations);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            modules_downloaded: self.modules_downloaded.load(Ordering::Relaxed),
            modules_failed: self.modules_failed.load(Ordering::Relaxed),
            modules_skipped: self.modules_skipped.load(Ordering::Relaxed),
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            optional_fetch_absorbed: self.optional_fetch_absorbed.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub modules_downloaded: u64,
    pub modules_failed: u64,
    pub modules_skipped: u64,
    pub files_downloaded: u64,
    pub files_skipped: u64,
    pub optional_fetch_absorbed: u64,
    pub invalidations: u64,
}
