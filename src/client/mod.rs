//! HTTP plumbing with retry and status validation.
//!
//! The client is a stack of [`Transport`] decorators around a base transport:
//!
//! ```text
//! RetryingClient
//!   └── ValidatingTransport   (logs, raises on non-2xx)
//!         └── RetryTransport  (retries 429/502/503/504 with backoff)
//!               └── T         (ReqwestTransport in production)
//! ```
//!
//! Retry runs first and returns whatever response it ends with; validation sits
//! outside and is the only layer that turns a bad status into an error.

pub mod retry;
pub mod validate;

use crate::config::TransportConfig;
use crate::error::Result;
use reqwest::header::HeaderMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

pub use reqwest::Method;
pub use retry::{RetryPolicy, RetryTransport};
pub use validate::{StatusValidation, ValidatingTransport};

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-request options. Empty by default.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn json(body: &impl serde::Serialize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(Self {
            headers,
            body: Some(serde_json::to_string(body)?),
            ..Self::default()
        })
    }
}

/// Something that can perform one HTTP exchange.
///
/// Implementations return `Ok` for any status the server sends; only
/// connection-level failures are errors at this level.
pub trait Transport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse>;
}

impl<T: Transport> Transport for Arc<T> {
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.as_ref().send(method, url, options).await
    }
}

/// Base transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(5));
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip_all, fields(%method, %url))]
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(options.headers.clone());
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let t0 = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse {
            method,
            url: final_url,
            status,
            headers,
            body,
            elapsed: t0.elapsed(),
        })
    }
}

/// Verb-level client with uniform retry and validation semantics.
///
/// Cloning is cheap; clones share the underlying transport stack.
pub struct RetryingClient<T> {
    inner: Arc<ValidatingTransport<RetryTransport<T>>>,
}

impl<T> Clone for RetryingClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for RetryingClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingClient")
            .field("retry", self.inner.inner().policy())
            .finish()
    }
}

impl<T: Transport> RetryingClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_validation(transport, policy, StatusValidation::default())
    }

    pub fn with_validation(transport: T, policy: RetryPolicy, validation: StatusValidation) -> Self {
        Self {
            inner: Arc::new(ValidatingTransport::new(
                RetryTransport::new(transport, policy),
                validation,
            )),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.inner.send(method, url, options).await
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(Method::PUT, url, options).await
    }

    pub async fn patch(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(Method::PATCH, url, options).await
    }

    pub async fn delete(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(Method::DELETE, url, options).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedTransport};
    use super::*;
    use crate::error::CrawlError;

    const URL: &str = "https://example.com/";

    #[tokio::test(start_paused = true)]
    async fn test_get_retries_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            URL,
            vec![Reply::status(503), Reply::html("<p>ok</p>")],
        ));
        let client = RetryingClient::new(Arc::clone(&transport), RetryPolicy::crawl());
        let response = client.get(URL, &RequestOptions::default()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<p>ok</p>");
        assert_eq!(transport.calls_to(URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_raise_transient() {
        let transport = Arc::new(ScriptedTransport::new().reply(URL, vec![Reply::status(429)]));
        let client = RetryingClient::new(Arc::clone(&transport), RetryPolicy::crawl());
        let err = client.get(URL, &RequestOptions::default()).await.unwrap_err();
        assert!(matches!(err, CrawlError::TransientHttp { status: 429, .. }));
        assert_eq!(transport.calls_to(URL), 3);
    }

    #[tokio::test]
    async fn test_terminal_status_not_retried() {
        let transport = Arc::new(ScriptedTransport::new().reply(URL, vec![Reply::status(404)]));
        let client = RetryingClient::new(Arc::clone(&transport), RetryPolicy::crawl());
        let err = client.delete(URL, &RequestOptions::default()).await.unwrap_err();
        assert!(matches!(err, CrawlError::TerminalHttp { status: 404, .. }));
        assert_eq!(transport.calls(), vec![(Method::DELETE, URL.to_string())]);
    }

    #[tokio::test]
    async fn test_every_verb_uses_its_method() {
        let transport = Arc::new(ScriptedTransport::new().reply(URL, vec![Reply::status(204)]));
        let client = RetryingClient::new(Arc::clone(&transport), RetryPolicy::default());
        let options = RequestOptions::json(&serde_json::json!({"k": "v"})).unwrap();
        client.post(URL, &options).await.unwrap();
        client.put(URL, &options).await.unwrap();
        client.patch(URL, &options).await.unwrap();
        let methods: Vec<Method> = transport.calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec![Method::POST, Method::PUT, Method::PATCH]);
    }
}
