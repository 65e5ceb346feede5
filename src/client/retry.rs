//! Retry with exponential backoff for transient HTTP statuses.
//!
//! [`RetryTransport`] wraps any [`Transport`] and re-issues the request while
//! the server answers 429/502/503/504, up to `max_attempts` total tries. It
//! never raises on status: when attempts run out, or the status is not
//! retryable, the last response is returned as-is.
//!
//! # Delay between attempts
//!
//! ```text
//! Retry-After: <seconds>    -> seconds
//! Retry-After: <http-date>  -> max(0, date - now)
//! otherwise                 -> backoff_factor * 2^(attempts_made - 1)
//! ```
//!
//! Every delay is clamped to `max_backoff_wait`.

use super::{HttpResponse, Method, RequestOptions, Transport};
use crate::error::Result;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{instrument, warn};

/// Statuses worth retrying.
pub const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

pub fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Retry budget and backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, the first one included.
    pub max_attempts: u32,
    /// Seconds; doubled for each further retry.
    pub backoff_factor: f64,
    pub max_backoff_wait: Duration,
}

impl Default for RetryPolicy {
    /// The generic client policy: 3 attempts, 0.1s factor, 30s cap.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 0.1,
            max_backoff_wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// The policy used for crawl fetches: 3 attempts, 1s factor, 30s cap.
    pub fn crawl() -> Self {
        Self {
            backoff_factor: 1.0,
            ..Self::default()
        }
    }

    /// How long to wait before the next attempt, given how many attempts were
    /// already made and the headers of the last response.
    pub fn delay_for(&self, attempts_made: u32, headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
        if let Some(delay) = self.retry_after(headers, now) {
            return delay.min(self.max_backoff_wait);
        }
        let exponent = attempts_made.saturating_sub(1).min(63) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        self.clamp_secs(secs)
    }

    fn retry_after(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
        let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse::<u64>().ok().map(Duration::from_secs);
        }
        let date = DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()?
            .with_timezone(&Utc);
        let diff = (date - now).to_std().unwrap_or(Duration::ZERO);
        Some(diff)
    }

    fn clamp_secs(&self, secs: f64) -> Duration {
        if !secs.is_finite() || secs <= 0.0 {
            return Duration::ZERO;
        }
        let cap = self.max_backoff_wait.as_secs_f64();
        Duration::from_secs_f64(secs.min(cap))
    }
}

/// Transport decorator that retries transient statuses.
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    #[instrument(level = "debug", skip_all, fields(%method, %url))]
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let total_t0 = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts_made = 0u32;
        let mut previous: Option<HttpResponse> = None;

        loop {
            if let Some(last) = &previous {
                let delay = self.policy.delay_for(attempts_made, &last.headers, Utc::now());
                warn!(
                    %method,
                    %url,
                    status = last.status,
                    attempts_made,
                    remaining = max_attempts - attempts_made,
                    ?delay,
                    "Transient status; backing off before retry"
                );
                sleep(delay).await;
            }

            let response = self.inner.send(method.clone(), url, options).await?;
            attempts_made += 1;

            if !is_retryable(response.status) {
                return Ok(response);
            }
            if attempts_made >= max_attempts {
                warn!(
                    %method,
                    %url,
                    status = response.status,
                    attempts_made,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    "Retries exhausted"
                );
                return Ok(response);
            }
            previous = Some(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Reply, ScriptedTransport};
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;

    const URL: &str = "https://example.com/list";

    fn retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_factor: 1.5,
            max_backoff_wait: Duration::from_secs(10),
        };
        let delays: Vec<f64> = (1..=5)
            .map(|n| policy.delay_for(n, &HeaderMap::new(), now()).as_secs_f64())
            .collect();
        assert_eq!(delays, vec![1.5, 3.0, 6.0, 10.0, 10.0]);
    }

    #[test]
    fn test_default_and_crawl_factors() {
        let headers = HeaderMap::new();
        assert_eq!(
            RetryPolicy::default().delay_for(1, &headers, now()),
            Duration::from_millis(100)
        );
        assert_eq!(
            RetryPolicy::crawl().delay_for(2, &headers, now()),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_retry_after_seconds() {
        let policy = RetryPolicy::crawl();
        assert_eq!(
            policy.delay_for(1, &retry_after("7"), now()),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.delay_for(1, &retry_after("120"), now()),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_retry_after_http_date() {
        let policy = RetryPolicy::crawl();
        assert_eq!(
            policy.delay_for(1, &retry_after("Tue, 06 May 2025 12:00:05 GMT"), now()),
            Duration::from_secs(5)
        );
        // a date in the past means "retry now"
        assert_eq!(
            policy.delay_for(1, &retry_after("Tue, 06 May 2025 11:00:00 GMT"), now()),
            Duration::ZERO
        );
    }

    #[test]
    fn test_unparsable_retry_after_falls_back_to_backoff() {
        let policy = RetryPolicy::crawl();
        assert_eq!(
            policy.delay_for(3, &retry_after("soon"), now()),
            Duration::from_secs(4)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_after_two_sleeps() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            URL,
            vec![Reply::status(429), Reply::status(429), Reply::html("ok")],
        ));
        let retry = RetryTransport::new(Arc::clone(&transport), RetryPolicy::crawl());

        let t0 = tokio::time::Instant::now();
        let response = retry
            .send(Method::GET, URL, &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls_to(URL), 3);
        // 1s then 2s of virtual sleep
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_response() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            URL,
            vec![Reply::status(503), Reply::status(503), Reply::status(503)],
        ));
        let retry = RetryTransport::new(Arc::clone(&transport), RetryPolicy::crawl());
        let response = retry
            .send(Method::GET, URL, &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(transport.calls_to(URL), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_header_drives_sleep() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            URL,
            vec![Reply::status(503).header("retry-after", "4"), Reply::html("ok")],
        ));
        let retry = RetryTransport::new(Arc::clone(&transport), RetryPolicy::default());
        let t0 = tokio::time::Instant::now();
        retry
            .send(Method::GET, URL, &RequestOptions::default())
            .await
            .unwrap();
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4100), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_non_retryable_returned_immediately() {
        let transport = Arc::new(ScriptedTransport::new().reply(URL, vec![Reply::status(500)]));
        let retry = RetryTransport::new(Arc::clone(&transport), RetryPolicy::crawl());
        let response = retry
            .send(Method::GET, URL, &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(transport.calls_to(URL), 1);
    }
}
