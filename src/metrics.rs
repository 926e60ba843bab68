use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing grouping activity.
#[derive(Default)]
pub struct GroupingMetrics {
    requests: AtomicU64,
    posts_received: AtomicU64,
    embedding_failures: AtomicU64,
    groups_summarized: AtomicU64,
    summary_fallbacks: AtomicU64,
}

impl GroupingMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted grouping request and the number of posts it carried.
    pub fn record_request(&self, post_count: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.posts_received.fetch_add(post_count, Ordering::Relaxed);
    }

    /// Record posts that could not be embedded and were passed through as singletons.
    pub fn record_embedding_failures(&self, count: u64) {
        self.embedding_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a summarized group, flagging whether the fallback text was used.
    pub fn record_summary(&self, fallback: bool) {
        self.groups_summarized.fetch_add(1, Ordering::Relaxed);
        if fallback {
            self.summary_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            posts_received: self.posts_received.load(Ordering::Relaxed),
            embedding_failures: self.embedding_failures.load(Ordering::Relaxed),
            groups_summarized: self.groups_summarized.load(Ordering::Relaxed),
            summary_fallbacks: self.summary_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of grouping counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of grouping requests accepted since startup.
    pub requests: u64,
    /// Total posts received across all accepted requests.
    pub posts_received: u64,
    /// Posts that exhausted their embedding attempts.
    pub embedding_failures: u64,
    /// Multi-post groups sent to the summarizer.
    pub groups_summarized: u64,
    /// Groups that received the fallback summary text.
    pub summary_fallbacks: u64,
}
