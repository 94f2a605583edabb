use std::sync::Arc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use super::counter::Counter;
use super::downloader::Downloader;
use super::frontier::{Frontier, Task};
use super::limiter::RateLimiter;
use super::parser;
use super::sink::{Record, Sink};
use crate::Error;

/// One unit of the worker pool: dequeues, rate-limits, fetches, records and
/// enqueues children, until the frontier closes or the crawl is cancelled.
pub struct CrawlWorker {
    pub(super) downloader: Arc<dyn Downloader>,
    pub(super) frontier: Arc<Frontier>,
    pub(super) limiter: Arc<RateLimiter>,
    pub(super) counter: Arc<Counter>,
    pub(super) sink: Arc<dyn Sink>,
    pub(super) max_depth: u16,
    pub(super) request_timeout: Duration,
}

impl CrawlWorker {
    pub async fn run(self, worker_id: usize, cancel: CancellationToken) -> Result<(), Error> {
        log::debug!("worker {} started", worker_id);

        loop {
            let task = tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("worker {} interrupted", worker_id);
                    return Err(Error::Interrupted);
                }
                task = self.frontier.next() => match task {
                    Some(task) => task,
                    None => {
                        log::debug!("frontier dried; worker {} stopping", worker_id);
                        return Ok(());
                    }
                },
            };

            // In-flight from the moment of dequeue. Anything less and the
            // drain check could close the frontier under our feet while we
            // sit in the limiter queue.
            self.frontier.mark_start();

            let admitted = self.limiter.wait(&cancel).await;
            if admitted.is_ok() {
                self.process(task).await;
            }

            self.counter.register_closed();
            self.frontier.mark_done();

            if let Err(interrupted) = admitted {
                return Err(interrupted);
            }
        }
    }

    /// Fetch one page, publish its record, and push its children. The record
    /// always goes out before any child is enqueued, so tree sinks see the
    /// parent exist first.
    async fn process(&self, task: Task) {
        // Download, but be quick about it.
        let fetched = time::timeout(self.request_timeout, self.downloader.download(&task.url));

        match fetched.await {
            Ok(Ok(downloaded)) => {
                let links = parser::extract_links(&downloaded.content, &task.url);
                log::debug!("at {}: found {} links", task.url, links.len());

                let record = Record::response(&task, downloaded.status_code, links.len());
                if let Err(error) = self.sink.publish(record).await {
                    log::warn!("sink failed at {}: {}", task.url, error);
                }

                let next_depth = task.depth.saturating_add(1);
                if next_depth <= self.max_depth {
                    for child in links {
                        self.frontier.enqueue_if_new(Task {
                            url: child,
                            depth: next_depth,
                            parent: Some(task.url.clone()),
                        });
                    }
                }
            }
            Ok(Err(error)) => {
                log::warn!("at {} got: {}", task.url, error);
                self.record_failure(&task).await;
            }
            Err(_) => {
                log::warn!("at {}: got timeout", task.url);
                self.record_failure(&task).await;
            }
        }
    }

    async fn record_failure(&self, task: &Task) {
        self.counter.register_error();

        let record = Record::fetch_failure(task);
        if let Err(error) = self.sink.publish(record).await {
            log::warn!("sink failed at {}: {}", task.url, error);
        }
    }
}
