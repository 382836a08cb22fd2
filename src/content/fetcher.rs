/// HTTP access to remote attachment content.
///
/// `ContentFetcher` is the seam the resolver depends on; `HttpContentFetcher`
/// is the production implementation over a blocking reqwest client.
use std::time::Duration;

use reqwest::header::ACCEPT;
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while fetching remote content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failures, DNS resolution, body read errors
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The Binary resource metadata was not valid JSON
    #[error("Invalid Binary metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// 2xx response without a body
    #[error("Empty response body")]
    EmptyBody,
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// Performs one GET with the given `Accept` header and returns the body.
pub trait ContentFetcher {
    fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F: ContentFetcher + ?Sized> ContentFetcher for &F {
    fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url, accept)
    }
}

/// Builder for constructing `HttpContentFetcher` instances.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use clinotes::HttpContentFetcherBuilder;
///
/// let fetcher = HttpContentFetcherBuilder::new()
///     .timeout(Duration::from_secs(5))
///     .build()
///     .expect("Failed to create fetcher");
/// assert_eq!(fetcher.timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Default)]
pub struct HttpContentFetcherBuilder {
    timeout: Option<Duration>,
}

impl HttpContentFetcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout applied to every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpContentFetcher, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(FetchError::Network)?;

        Ok(HttpContentFetcher { client, timeout })
    }
}

/// Blocking HTTP fetcher. Construct it with [`HttpContentFetcherBuilder`].
pub struct HttpContentFetcher {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpContentFetcher {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ContentFetcher for HttpContentFetcher {
    fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>, FetchError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, accept)
            .send()
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(FetchError::from_reqwest)?;
        Ok(body.to_vec())
    }
}
