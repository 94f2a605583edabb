//! The crawl engine: a bounded deduplicated frontier, a pool of concurrent
//! workers behind one global rate limiter, and drain-aware termination.

mod counter;
mod downloader;
mod frontier;
mod limiter;
mod parser;
mod sink;
mod tree;
mod worker;

pub use self::counter::Counter;
pub use self::downloader::{ClientOpts, Downloaded, Downloader, HttpDownloader};
pub use self::frontier::{Frontier, FrontierStats, Task};
pub use self::limiter::RateLimiter;
pub use self::parser::{anchor_hrefs, checked_join, extract_links};
pub use self::sink::{CsvSink, FanoutSink, LogSink, MemorySink, Record, Sink, UNKNOWN_STATUS};
pub use self::tree::{LinkTree, Node};

use self::worker::CrawlWorker;

use futures::future;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Error;

/// How often the supervisor samples the frontier for the drain condition.
const SUPERVISOR_CADENCE: Duration = Duration::from_millis(150);

/// Configuration parameters for crawling.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub workers: usize,
    pub queue_size: usize,
    pub rate: f64,
    pub burst: u32,
    /// Inclusive: depth 0 crawls the seeds only.
    pub max_depth: u16,
    /// Hard ceiling on one fetch, over and above the transport's own
    /// timeouts.
    pub request_timeout: Duration,
    pub do_not_log_stats: bool,
    pub log_stats_every_secs: f64,
}

/// Checks and canonicalizes a seed: http(s), a real host, no fragment.
pub fn normalize_seed(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw.trim())?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::UnacceptedScheme(raw.to_owned()));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(Error::NoHost(raw.to_owned()));
    }
    url.set_fragment(None);

    Ok(url)
}

/// The crawl façade. Owns the frontier, the rate limiter and the shared
/// downloader for the duration of one run.
pub struct Crawler {
    downloader: Arc<dyn Downloader>,
    frontier: Arc<Frontier>,
    limiter: Arc<RateLimiter>,
    counter: Arc<Counter>,
    parameters: Parameters,
}

impl Crawler {
    pub fn new(downloader: Arc<dyn Downloader>, parameters: Parameters) -> Result<Crawler, Error> {
        if parameters.workers == 0 {
            return Err(Error::BadConfig("need at least one worker".to_owned()));
        }
        if parameters.queue_size == 0 {
            return Err(Error::BadConfig("queue size must be positive".to_owned()));
        }

        let limiter = Arc::new(RateLimiter::new(parameters.rate, parameters.burst)?);

        Ok(Crawler {
            downloader,
            frontier: Arc::new(Frontier::new(parameters.queue_size)),
            limiter,
            counter: Arc::new(Counter::default()),
            parameters,
        })
    }

    /// Offers seed URLs at depth 0 and reports how many were accepted.
    /// Invalid seeds are skipped with a log line.
    pub fn seed<I, S>(&self, raw_urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for raw in raw_urls {
            match normalize_seed(raw.as_ref()) {
                Ok(url) => {
                    if self.frontier.enqueue_if_new(Task {
                        url,
                        depth: 0,
                        parent: None,
                    }) {
                        added += 1;
                    }
                }
                Err(err) => log::warn!("skipping seed `{}`: {}", raw.as_ref(), err),
            }
        }

        added
    }

    pub fn counter(&self) -> Arc<Counter> {
        self.counter.clone()
    }

    pub fn stats(&self) -> FrontierStats {
        self.frontier.stats()
    }

    /// Runs the crawl to completion, streaming one record per page into
    /// `sink`.
    ///
    /// Returns `Ok(())` once the frontier has drained and every worker has
    /// stopped, or `Err(Error::Interrupted)` if `cancel` fired first. All
    /// other trouble (bad pages, timeouts, full queue) is absorbed into
    /// records, counters and logs.
    pub async fn run(&self, cancel: CancellationToken, sink: Arc<dyn Sink>) -> Result<(), Error> {
        let mut handles = Vec::with_capacity(self.parameters.workers);
        for worker_id in 0..self.parameters.workers {
            let worker = CrawlWorker {
                downloader: self.downloader.clone(),
                frontier: self.frontier.clone(),
                limiter: self.limiter.clone(),
                counter: self.counter.clone(),
                sink: sink.clone(),
                max_depth: self.parameters.max_depth,
                request_timeout: self.parameters.request_timeout,
            };
            handles.push(tokio::spawn(worker.run(worker_id, cancel.clone())));
        }

        if !self.parameters.do_not_log_stats {
            tokio::spawn(counter::log_stats(
                self.counter.clone(),
                self.frontier.clone(),
                self.parameters.log_stats_every_secs,
            ));
        }

        // The drain check: children are only enqueued by in-flight workers,
        // so an empty queue with nothing in flight is final. The condition
        // must hold on two consecutive ticks before we believe it, which
        // rules out sampling a task in the instant between dequeue and its
        // in-flight mark.
        let mut interrupted = false;
        let mut has_been_empty = false;
        let mut ticker = tokio::time::interval(SUPERVISOR_CADENCE);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("crawl cancelled; closing the frontier");
                    interrupted = true;
                    self.frontier.close_once();
                    break;
                }
                _ = ticker.tick() => {
                    let stats = self.frontier.stats();
                    if stats.queued == 0 && stats.inflight == 0 {
                        if has_been_empty {
                            log::debug!("frontier drained twice in a row; closing");
                            self.frontier.close_once();
                            break;
                        }
                        has_been_empty = true;
                    } else {
                        has_been_empty = false;
                    }
                }
            }
        }

        for outcome in future::join_all(handles).await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(Error::Interrupted)) => interrupted = true,
                Ok(Err(error)) => log::error!("worker failed: {}", error),
                Err(join_error) => log::error!("worker panicked: {}", join_error),
            }
        }

        let stats = self.frontier.stats();
        log::info!(
            "crawl done: {} pages, {} errors, {} dropped",
            self.counter.n_closed(),
            self.counter.n_error(),
            stats.dropped,
        );

        if interrupted {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}
