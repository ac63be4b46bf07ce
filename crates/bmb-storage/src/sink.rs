//! Pushes API payload pairs to the target service.
//!
//! The engine only produces payloads in input order; batching, the delay
//! between batches and retry with backoff all live here.

use std::time::Duration;

use async_trait::async_trait;
use bmb_core::{ApiPayloadPair, AttachTagsRequest, CreateBookmarkRequest};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Try again, after the delay the sink asked for when it sent one.
    Retry(Option<Duration>),
    GiveUp,
}

/// Throttling, request timeouts and server errors are retried.
pub fn classify_response(status: StatusCode, headers: &HeaderMap) -> RetryDisposition {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDisposition::Retry(retry_after(headers))
    } else {
        RetryDisposition::GiveUp
    }
}

/// `Retry-After` in its delta-seconds form; HTTP-date values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

pub fn classify_transport_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() {
        RetryDisposition::Retry(None)
    } else {
        RetryDisposition::GiveUp
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total tries per request, the first one included.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `retry`-th retry (0-based). A server hint replaces the
    /// doubling step; either way the result is capped at `max_delay`.
    pub fn delay_before_retry(&self, retry: usize, hint: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(u32::try_from(retry).unwrap_or(u32::MAX));
        hint.unwrap_or_else(|| self.initial_delay.saturating_mul(factor))
            .min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing sink setting {0}")]
    MissingSetting(&'static str),
    #[error("invalid sink setting {name}: {value:?}")]
    InvalidSetting { name: &'static str, value: String },
}

/// Bookmark as acknowledged by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBookmark {
    pub id: String,
    /// `false` when the sink reported the URL as already bookmarked.
    pub created: bool,
}

#[async_trait]
pub trait BookmarkSink: Send + Sync {
    async fn create_bookmark(&self, request: &CreateBookmarkRequest) -> Result<CreatedBookmark, SinkError>;

    async fn attach_tags(&self, bookmark_id: &str, request: &AttachTagsRequest) -> Result<(), SinkError>;
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl SinkConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(20),
            user_agent: Some(format!("bookmark-bridge/{}", env!("CARGO_PKG_VERSION"))),
            retry: RetryPolicy::default(),
        }
    }

    /// `BMB_SINK_URL` and `BMB_SINK_API_KEY` are required;
    /// `BMB_SINK_TIMEOUT_SECS` defaults to 20.
    pub fn from_env() -> Result<Self, SinkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SinkError> {
        let base_url = lookup("BMB_SINK_URL").ok_or(SinkError::MissingSetting("BMB_SINK_URL"))?;
        let api_key = lookup("BMB_SINK_API_KEY").ok_or(SinkError::MissingSetting("BMB_SINK_API_KEY"))?;
        let mut config = Self::new(base_url, api_key);
        if let Some(raw) = lookup("BMB_SINK_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(SinkError::InvalidSetting {
                    name: "BMB_SINK_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct BookmarkResponse {
    id: String,
}

#[derive(Debug)]
pub struct HttpBookmarkSink {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpBookmarkSink {
    pub fn new(config: SinkConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn post_json<B: Serialize + Sync + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(StatusCode, Vec<u8>), SinkError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let can_retry = attempt < self.retry.max_attempts;
            let result = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let hint = match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp.bytes().await?.to_vec();
                        return Ok((status, body));
                    }
                    match classify_response(status, resp.headers()) {
                        RetryDisposition::Retry(hint) if can_retry => {
                            warn!(%status, attempt, ?hint, "sink throttled or failed; retrying");
                            hint
                        }
                        _ => {
                            return Err(SinkError::HttpStatus {
                                status: status.as_u16(),
                                url: url.to_string(),
                            })
                        }
                    }
                }
                Err(err) => match classify_transport_error(&err) {
                    RetryDisposition::Retry(hint) if can_retry => {
                        warn!(error = %err, attempt, "sink request error; retrying");
                        hint
                    }
                    _ => return Err(SinkError::Request(err)),
                },
            };
            tokio::time::sleep(self.retry.delay_before_retry(attempt - 1, hint)).await;
        }
    }
}

#[async_trait]
impl BookmarkSink for HttpBookmarkSink {
    async fn create_bookmark(&self, request: &CreateBookmarkRequest) -> Result<CreatedBookmark, SinkError> {
        let url = self.endpoint("bookmarks");
        let span = info_span!("sink_create", bookmark_url = %request.url);
        let (status, body) = self.post_json(&url, request).instrument(span).await?;
        let parsed: BookmarkResponse =
            serde_json::from_slice(&body).map_err(|source| SinkError::Decode { url, source })?;
        Ok(CreatedBookmark {
            id: parsed.id,
            created: status == StatusCode::CREATED,
        })
    }

    async fn attach_tags(&self, bookmark_id: &str, request: &AttachTagsRequest) -> Result<(), SinkError> {
        let url = self.endpoint(&format!("bookmarks/{bookmark_id}/tags"));
        let span = info_span!("sink_attach_tags", bookmark_id, tags = request.tags.len());
        self.post_json(&url, request).instrument(span).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PushConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PushStage {
    Create,
    AttachTags,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushFailure {
    pub index: usize,
    pub url: String,
    pub stage: PushStage,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub created: usize,
    pub existing: usize,
    pub tagged: usize,
    pub failures: Vec<PushFailure>,
}

/// Sends every pair in order. A tag payload goes to the bookmark returned for
/// its own create payload; failures are collected and never stop the push.
pub async fn push_payloads<S: BookmarkSink + ?Sized>(
    sink: &S,
    pairs: &[ApiPayloadPair],
    config: &PushConfig,
) -> PushReport {
    let batch_size = config.batch_size.max(1);
    let mut report = PushReport::default();

    for (batch_index, batch) in pairs.chunks(batch_size).enumerate() {
        if batch_index > 0 && !config.batch_delay.is_zero() {
            tokio::time::sleep(config.batch_delay).await;
        }
        for (offset, pair) in batch.iter().enumerate() {
            let index = batch_index * batch_size + offset;
            let created = match sink.create_bookmark(&pair.create).await {
                Ok(created) => created,
                Err(err) => {
                    warn!(index, url = %pair.create.url, error = %err, "create failed");
                    report.failures.push(PushFailure {
                        index,
                        url: pair.create.url.clone(),
                        stage: PushStage::Create,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            if created.created {
                report.created += 1;
            } else {
                report.existing += 1;
            }

            let Some(tags) = &pair.tags else {
                continue;
            };
            match sink.attach_tags(&created.id, tags).await {
                Ok(()) => report.tagged += 1,
                Err(err) => {
                    warn!(index, bookmark_id = %created.id, error = %err, "attaching tags failed");
                    report.failures.push(PushFailure {
                        index,
                        url: pair.create.url.clone(),
                        stage: PushStage::AttachTags,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    report
}
