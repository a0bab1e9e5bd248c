use std::fmt;
#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Search statistics for a single decision.
///
/// Counting is only compiled in with the `metrics` feature. Without it, every update is a no-op and the counters always read zero.
#[derive(Debug, Default)]
pub struct Metrics {
    #[cfg(feature = "metrics")]
    max_depth: AtomicU64,
    #[cfg(feature = "metrics")]
    nodes_expanded: AtomicU64,
    #[cfg(feature = "metrics")]
    table_hits: AtomicU64,
    #[cfg(feature = "metrics")]
    table_misses: AtomicU64,
}

#[cfg(feature = "metrics")]
impl Metrics {
    pub fn reset(&self) {
        self.max_depth.store(0, Ordering::Relaxed);
        self.nodes_expanded.store(0, Ordering::Relaxed);
        self.table_hits.store(0, Ordering::Relaxed);
        self.table_misses.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_depth(&self, depth: u16) {
        self.max_depth.fetch_max(depth as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_nodes(&self) {
        self.nodes_expanded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_probe(&self, hit: bool) {
        if hit {
            self.table_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.table_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn max_depth(&self) -> u64 {
        self.max_depth.load(Ordering::Relaxed)
    }

    pub fn nodes_expanded(&self) -> u64 {
        self.nodes_expanded.load(Ordering::Relaxed)
    }

    pub fn table_hits(&self) -> u64 {
        self.table_hits.load(Ordering::Relaxed)
    }

    pub fn table_misses(&self) -> u64 {
        self.table_misses.load(Ordering::Relaxed)
    }
}

#[cfg(not(feature = "metrics"))]
impl Metrics {
    pub fn reset(&self) {}

    #[inline]
    pub fn record_depth(&self, _depth: u16) {}

    #[inline]
    pub fn increment_nodes(&self) {}

    #[inline]
    pub fn record_probe(&self, _hit: bool) {}

    pub fn max_depth(&self) -> u64 {
        0
    }

    pub fn nodes_expanded(&self) -> u64 {
        0
    }

    pub fn table_hits(&self) -> u64 {
        0
    }

    pub fn table_misses(&self) -> u64 {
        0
    }
}

impl fmt::Display for Metrics {
    #[cfg(feature = "metrics")]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Max depth: {}, nodes expanded: {}, table hits: {}, table misses: {}",
            self.max_depth(),
            self.nodes_expanded(),
            self.table_hits(),
            self.table_misses()
        )
    }

    #[cfg(not(feature = "metrics"))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metrics disabled.")
    }
}

#[cfg(not(feature = "metrics"))]
#[test]
fn disabled_metrics_placeholder_test() {
    let metrics = Metrics::default();
    metrics.increment_nodes();
    assert_eq!(metrics.nodes_expanded(), 0);
    assert_eq!(metrics.to_string(), "Metrics disabled.");
}

#[cfg(feature = "metrics")]
#[test]
fn counters_test() {
    let metrics = Metrics::default();
    metrics.increment_nodes();
    metrics.increment_nodes();
    metrics.record_depth(3);
    metrics.record_depth(2);
    metrics.record_probe(true);
    metrics.record_probe(false);
    metrics.record_probe(false);
    assert_eq!(metrics.nodes_expanded(), 2);
    assert_eq!(metrics.max_depth(), 3);
    assert_eq!(metrics.table_hits(), 1);
    assert_eq!(metrics.table_misses(), 2);
    metrics.reset();
    assert_eq!(metrics.nodes_expanded(), 0);
}
