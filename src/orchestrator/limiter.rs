//! Start-rate limiter for the article fan-out.
//!
//! Caps how many tasks may *start* in any one-second window. The window slides:
//! a new start is allowed once the oldest start in the window is a full second
//! old. The in-flight cap is enforced separately by the fan-out's buffering.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RateLimiter {
    max_per_second: usize,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_per_second` of zero is treated as one.
    pub fn new(max_per_second: usize) -> Self {
        let max_per_second = max_per_second.max(1);
        Self {
            max_per_second,
            starts: Mutex::new(VecDeque::with_capacity(max_per_second)),
        }
    }

    pub fn max_per_second(&self) -> usize {
        self.max_per_second
    }

    /// Wait until a start is allowed, then record it.
    pub async fn acquire(&self) {
        loop {
            let wake_at = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();
                while starts.front().is_some_and(|t| *t + WINDOW <= now) {
                    starts.pop_front();
                }
                if starts.len() < self.max_per_second {
                    starts.push_back(now);
                    return;
                }
                match starts.front() {
                    Some(oldest) => *oldest + WINDOW,
                    None => now,
                }
            };
            trace!(wait_ms = (wake_at - Instant::now()).as_millis() as u64, "Start rate reached");
            sleep_until(wake_at).await;
        }
    }
}
