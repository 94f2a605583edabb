use structopt::StructOpt;
use tokio::time::Duration;

use crate::crawler::Parameters;

/// Tuning knobs for a crawl. See `Default` implementation for default values
/// on fields.
#[derive(Debug, Clone, StructOpt)]
pub struct Profile {
    /// The number of concurrent workers consuming the frontier.
    #[structopt(long, default_value = "16", env)]
    pub workers: usize,
    /// The size of the bounded frontier queue. Discovered links are dropped
    /// (and counted) when the queue is full.
    #[structopt(long, default_value = "2048", env)]
    pub queue: usize,
    /// Target request rate, in requests per second, shared by all workers.
    #[structopt(long, default_value = "5.0", env)]
    pub rps: f64,
    /// Burst size of the token bucket behind `--rps`.
    #[structopt(long, default_value = "5", env)]
    pub burst: u32,
    /// How many hops away from the seeds to crawl, inclusive. Depth 0 means
    /// the seeds only.
    #[structopt(long, default_value = "1", env)]
    pub depth: u16,
    /// Timeout for a whole request, in seconds.
    #[structopt(long, default_value = "30", env)]
    pub request_timeout: f64,
    /// Timeout for establishing a connection, in seconds.
    #[structopt(long, default_value = "10", env)]
    pub dial_timeout: f64,
    /// Whether to log stats or not:
    #[structopt(long, env)]
    pub do_not_log_stats: bool,
    /// Interval between consecutive stats log entries.
    #[structopt(long, default_value = "2", env)]
    pub log_stats_every_secs: f64,
    #[structopt(long, env)]
    pub user_agent: Option<String>,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            workers: 16,
            queue: 2048,
            rps: 5.0,
            burst: 5,
            depth: 1,
            request_timeout: 30.0,
            dial_timeout: 10.0,
            do_not_log_stats: false,
            log_stats_every_secs: 2.0,
            user_agent: None,
        }
    }
}

impl Profile {
    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or_else(|| crate::default_user_agent())
    }

    pub fn parameters(&self) -> Parameters {
        Parameters {
            workers: self.workers,
            queue_size: self.queue,
            rate: self.rps,
            burst: self.burst,
            max_depth: self.depth,
            request_timeout: Duration::from_secs_f64(self.request_timeout),
            do_not_log_stats: self.do_not_log_stats,
            log_stats_every_secs: self.log_stats_every_secs,
        }
    }
}
