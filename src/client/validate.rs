//! Status validation: the outer layer of the client stack.
//!
//! Logs every exchange at debug level and raises on a non-2xx final status.
//! A retryable status reaching this layer means the retry budget ran out, so
//! it becomes [`CrawlError::TransientHttp`]; anything else is
//! [`CrawlError::TerminalHttp`].

use super::retry::is_retryable;
use super::{HttpResponse, Method, RequestOptions, Transport};
use crate::error::{CrawlError, Result};
use crate::utils::truncate_for_log;
use std::fmt;
use tracing::{debug, error};

/// How much of the headers/body to keep in debug logs.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusValidation {
    pub log_limit: usize,
}

impl Default for StatusValidation {
    fn default() -> Self {
        Self { log_limit: 500 }
    }
}

impl StatusValidation {
    /// Log the exchange, then pass a 2xx through or convert anything else into
    /// an error.
    pub fn check(&self, response: HttpResponse) -> Result<HttpResponse> {
        debug!(
            method = %response.method,
            url = %response.url,
            status = response.status,
            elapsed_ms = response.elapsed.as_millis() as u64,
            headers = %truncate_for_log(&format!("{:?}", response.headers), self.log_limit),
            body = %truncate_for_log(&response.body, self.log_limit),
            "HTTP exchange"
        );

        if response.is_success() {
            return Ok(response);
        }

        error!(
            method = %response.method,
            url = %response.url,
            status = response.status,
            "Request failed"
        );
        let HttpResponse {
            method,
            url,
            status,
            ..
        } = response;
        if is_retryable(status) {
            Err(CrawlError::TransientHttp {
                method,
                url,
                status,
            })
        } else {
            Err(CrawlError::TerminalHttp {
                method,
                url,
                status,
            })
        }
    }
}

/// Transport decorator applying [`StatusValidation`] to whatever `inner` returns.
pub struct ValidatingTransport<T> {
    inner: T,
    validation: StatusValidation,
}

impl<T> ValidatingTransport<T> {
    pub fn new(inner: T, validation: StatusValidation) -> Self {
        Self { inner, validation }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for ValidatingTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingTransport")
            .field("validation", &self.validation)
            .finish()
    }
}

impl<T: Transport> Transport for ValidatingTransport<T> {
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let response = self.inner.send(method, url, options).await?;
        self.validation.check(response)
    }
}
