use async_channel::{Receiver, Sender, TrySendError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// A unit of crawl work: a page to fetch and how far from the seeds it was
/// found. The parent is recorded at enqueue time so that tree-shaped sinks
/// can link the outcome to the page that discovered it.
#[derive(Debug, Clone)]
pub struct Task {
    pub url: Url,
    pub depth: u16,
    pub parent: Option<Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierStats {
    pub queued: usize,
    pub inflight: usize,
    pub seen: usize,
    pub dropped: usize,
    pub closed: bool,
}

/// The bounded, deduplicated work queue shared by all workers.
///
/// A URL enters `seen` the moment it is offered, whether or not it also
/// enters the queue. Dedup is therefore global for the whole run: a URL
/// rediscovered at a lower depth is not enqueued a second time.
#[derive(Debug)]
pub struct Frontier {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    seen: Mutex<HashSet<String>>,
    inflight: AtomicUsize,
    dropped: AtomicUsize,
}

impl Frontier {
    pub fn new(queue_size: usize) -> Frontier {
        let (sender, receiver) = async_channel::bounded(queue_size);

        Frontier {
            sender,
            receiver,
            seen: Mutex::new(HashSet::new()),
            inflight: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Atomically tests the URL against `seen` and, if new, offers the task
    /// to the queue. Returns `true` only if the task was actually queued.
    /// A full or closed queue drops the task (counted), but the URL stays
    /// marked as seen.
    pub fn enqueue_if_new(&self, task: Task) -> bool {
        {
            let mut seen = self.seen.lock().expect("frontier seen set poisoned");
            if !seen.insert(task.url.to_string()) {
                return false;
            }
        }

        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                self.dropped.fetch_add(1, Ordering::Release);
                log::warn!("frontier full; dropping {}", task.url);
                false
            }
            Err(TrySendError::Closed(task)) => {
                self.dropped.fetch_add(1, Ordering::Release);
                log::debug!("frontier closed; dropping {}", task.url);
                false
            }
        }
    }

    /// Receives the next task, or `None` once the queue is closed and
    /// drained. Safe to call from any number of workers at once.
    pub async fn next(&self) -> Option<Task> {
        self.receiver.recv().await.ok()
    }

    pub fn mark_start(&self) {
        self.inflight.fetch_add(1, Ordering::Release);
    }

    pub fn mark_done(&self) {
        self.inflight.fetch_sub(1, Ordering::Release);
    }

    pub fn stats(&self) -> FrontierStats {
        FrontierStats {
            queued: self.receiver.len(),
            inflight: self.inflight.load(Ordering::Acquire),
            seen: self.seen.lock().expect("frontier seen set poisoned").len(),
            dropped: self.dropped.load(Ordering::Acquire),
            closed: self.sender.is_closed(),
        }
    }

    /// Closes the queue. Already-queued tasks can still be received; further
    /// enqueues are dropped. Calling this more than once is a no-op.
    pub fn close_once(&self) -> bool {
        self.receiver.close()
    }
}
