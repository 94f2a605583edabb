use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

use super::frontier::Frontier;

#[derive(Debug, Default)]
pub struct Counter {
    /// All tasks finished, no matter the outcome.
    closed_count: AtomicUsize,
    /// All tasks finished with a transport-level error.
    error_count: AtomicUsize,
}

impl Counter {
    pub fn register_closed(&self) {
        self.closed_count.fetch_add(1, Ordering::Release);
    }

    pub fn register_error(&self) {
        self.error_count.fetch_add(1, Ordering::Release);
    }

    pub fn n_closed(&self) -> usize {
        self.closed_count.load(Ordering::Acquire)
    }

    pub fn n_error(&self) -> usize {
        self.error_count.load(Ordering::Acquire)
    }
}

/// Logs crawl progress from time to time, until the frontier is closed and
/// everything in flight has landed.
pub async fn log_stats(counter: Arc<Counter>, frontier: Arc<Frontier>, every_secs: f64) {
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(every_secs));
    ticker.tick().await; // the immediate first tick

    loop {
        ticker.tick().await;
        let stats = frontier.stats();
        log::info!(
            "{} crawled ({} errors); {} queued, {} in flight, {} seen, {} dropped",
            counter.n_closed(),
            counter.n_error(),
            stats.queued,
            stats.inflight,
            stats.seen,
            stats.dropped,
        );

        if stats.closed && stats.queued == 0 && stats.inflight == 0 {
            break;
        }
    }
}
