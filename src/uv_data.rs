//! # UV Data Fetching with Retry
//!
//! This module handles all network operations for fetching current and
//! forecast UV index values from the currentuvindex.com API. It validates the
//! payload shape and absorbs transient failures with a bounded backoff loop,
//! so callers see exactly one [`FetchOutcome`] per request.
//!
//! ## Data Source
//!
//! - **URL**: `https://currentuvindex.com/api/v1/uvi?latitude=<lat>&longitude=<lon>`
//! - **Format**: JSON `{ ok, now: {time, uvi}, forecast: [{time, uvi}, ...] }`
//! - **Application errors**: `ok: false` signals failure even on HTTP 200
//!
//! ## Attempt Pipeline
//! 1. **Request**: HTTP GET to the API with the configured coordinates
//! 2. **Status**: anything outside 2xx fails the attempt
//! 3. **Parse**: body must be JSON of the expected shape
//! 4. **Validate**: `ok: false` fails the attempt, using the API's message
//!
//! ## Retry Strategy
//!
//! Every failed attempt is retried, whatever the cause, up to
//! [`backoff::MAX_ATTEMPTS`](crate::backoff::MAX_ATTEMPTS) total attempts with
//! full-jitter exponential backoff. Only exhaustion is reported upward. The
//! Fetcher never schedules future poll cycles; that is the Poller's job.
//!
//! All errors propagate through the `UvError` enum for consistent handling.

use crate::backoff::BackoffPolicy;
use crate::{FetchOutcome, UvReading, UvSnapshot};
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

/// Errors that can occur while fetching UV data.
///
/// The first four variants describe a single failed attempt and are all
/// retried identically. `RetriesExhausted` is terminal for one request.
#[derive(Error, Debug)]
pub enum UvError {
    /// Network or protocol failure before a response arrived
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered outside the 2xx range
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Body was not valid JSON of the expected shape
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body was well-formed but lacked a required field
    #[error("response is missing `{0}`")]
    Incomplete(&'static str),

    /// API reported `ok: false`
    #[error("UV API returned error: {0}")]
    Application(String),

    /// Every attempt failed
    #[error("gave up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

/// Public UV index API host
pub const DEFAULT_BASE_URL: &str = "https://currentuvindex.com";

/// Wire shape of the API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: Option<bool>,
    message: Option<String>,
    now: Option<UvReading>,
    forecast: Option<Vec<UvReading>>,
}

/// Validate one HTTP response and turn it into a snapshot.
///
/// A missing `ok` field counts as success; only an explicit `ok: false` is an
/// application-level failure.
///
/// # Example
/// ```
/// use uv_index_lib::uv_data::{parse_response, UvError};
///
/// let body = r#"{"ok":true,"now":{"time":"2024-06-21T12:00:00Z","uvi":6.4},"forecast":[]}"#;
/// let snapshot = parse_response(200, body).unwrap();
/// assert_eq!(snapshot.now.uvi, 6.4);
///
/// assert!(matches!(parse_response(503, ""), Err(UvError::Status(503))));
/// ```
pub fn parse_response(status: u16, body: &str) -> Result<UvSnapshot, UvError> {
    if !(200..300).contains(&status) {
        return Err(UvError::Status(status));
    }

    let response: ApiResponse = serde_json::from_str(body)?;

    if response.ok == Some(false) {
        let message = response
            .message
            .unwrap_or_else(|| "ok: false".to_string());
        return Err(UvError::Application(message));
    }

    let now = response.now.ok_or(UvError::Incomplete("now"))?;

    Ok(UvSnapshot {
        now,
        forecast: response.forecast.unwrap_or_default(),
    })
}

/// A single fetch attempt against some UV data source.
///
/// The retry loop in [`Fetcher`] is written against this trait so it can run
/// over a scripted source in tests.
pub trait UvApi {
    fn attempt(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<UvSnapshot, UvError>> + Send;
}

/// currentuvindex.com over HTTPS.
#[derive(Clone, Debug)]
pub struct HttpUvApi {
    client: reqwest::Client,
    base_url: String,
}

impl Default for HttpUvApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl HttpUvApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpUvApi {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Request URL for the given coordinates.
    pub fn request_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/api/v1/uvi?latitude={}&longitude={}",
            self.base_url.trim_end_matches('/'),
            latitude,
            longitude
        )
    }
}

impl UvApi for HttpUvApi {
    async fn attempt(&self, latitude: f64, longitude: f64) -> Result<UvSnapshot, UvError> {
        let url = self.request_url(latitude, longitude);
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_response(status, &body)
    }
}

/// Fetch-with-retry client: one call, at most `max_attempts` attempts.
#[derive(Clone, Debug)]
pub struct Fetcher<A> {
    api: A,
    policy: BackoffPolicy,
}

impl Fetcher<HttpUvApi> {
    /// Fetcher against the given API host with the default backoff policy.
    pub fn http(base_url: impl Into<String>) -> Self {
        Fetcher::new(HttpUvApi::new(base_url), BackoffPolicy::default())
    }
}

impl<A: UvApi> Fetcher<A> {
    pub fn new(api: A, policy: BackoffPolicy) -> Self {
        Fetcher { api, policy }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fetch UV data for a location and fold the result into a [`FetchOutcome`].
    ///
    /// # Example
    /// ```no_run
    /// use uv_index_lib::uv_data::Fetcher;
    /// use uv_index_lib::FetchOutcome;
    ///
    /// # async fn demo() {
    /// let fetcher = Fetcher::http("https://currentuvindex.com");
    /// match fetcher.fetch(40.6943, -73.9249).await {
    ///     FetchOutcome::Success(snapshot) => println!("UV now: {}", snapshot.now.uvi),
    ///     FetchOutcome::Failure { message, .. } => eprintln!("UV fetch failed: {}", message),
    /// }
    /// # }
    /// ```
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> FetchOutcome {
        match self.fetch_with_retry(latitude, longitude).await {
            Ok(snapshot) => FetchOutcome::Success(snapshot),
            Err(UvError::RetriesExhausted { message, .. }) => FetchOutcome::Failure {
                message,
                exhausted_retries: true,
            },
            Err(other) => FetchOutcome::Failure {
                message: other.to_string(),
                exhausted_retries: false,
            },
        }
    }

    /// Run the attempt loop, sleeping a jittered backoff between attempts.
    pub async fn fetch_with_retry(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<UvSnapshot, UvError> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error: Option<UvError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.delay(attempt);
                log::debug!(
                    "Waiting {} ms before UV fetch attempt {}/{}",
                    delay.as_millis(),
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match self.api.attempt(latitude, longitude).await {
                Ok(snapshot) => {
                    if attempt > 1 {
                        log::info!("UV fetch succeeded on attempt {}", attempt);
                    }
                    return Ok(snapshot);
                }
                Err(err) => {
                    log::warn!(
                        "UV fetch attempt {}/{} failed: {}",
                        attempt,
                        max_attempts,
                        err
                    );
                    last_error = Some(err);
                }
            }
        }

        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        log::error!("Error fetching UV data: {}", message);

        Err(UvError::RetriesExhausted {
            attempts: max_attempts,
            message,
        })
    }
}
