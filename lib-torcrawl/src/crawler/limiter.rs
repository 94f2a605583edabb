use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::Error;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// A token bucket shared by every worker: one token per outgoing request,
/// replenished at `rate` tokens per second with up to `burst` banked.
pub struct RateLimiter {
    inner: DirectLimiter,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Result<RateLimiter, Error> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::BadConfig(format!("rate must be positive: {rate}")));
        }
        let burst = NonZeroU32::new(burst)
            .ok_or_else(|| Error::BadConfig("burst must be at least 1".to_owned()))?;

        let period = Duration::from_secs_f64(1.0 / rate);
        let quota = Quota::with_period(period)
            .ok_or_else(|| Error::BadConfig(format!("rate too high: {rate}")))?
            .allow_burst(burst);

        Ok(RateLimiter {
            inner: governor::RateLimiter::direct(quota),
        })
    }

    /// Blocks until a token is available or the crawl is cancelled.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), Error> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Interrupted),
            _ = self.inner.until_ready() => Ok(()),
        }
    }
}
