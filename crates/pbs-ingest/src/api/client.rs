//! HTTP client for the PBS data API
//!
//! One request per table. Responses are gzip-compressed JSON; a `204 No
//! Content` means the table is empty for the requested schedule. Requests are
//! paced to a fixed minimum interval, because the service throttles harder
//! than its published limit.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::models::ApiEnvelope;
use crate::config::ApiConfig;
use crate::error::{IngestError, Result};
use crate::schema::Record;

/// Result of fetching one table
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Records(Vec<Record>),
    /// The source answered "no content": zero records, not an error
    NoContent,
}

impl FetchOutcome {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            FetchOutcome::Records(records) => records,
            FetchOutcome::NoContent => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::Records(records) => records.len(),
            FetchOutcome::NoContent => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Anything that can supply the records of a named table
#[async_trait]
pub trait TableSource: Send {
    /// Fetch every record of `endpoint`, restricted to `schedule_code` if given
    async fn fetch(&mut self, endpoint: &str, schedule_code: Option<&str>) -> Result<FetchOutcome>;
}

/// Enforces a minimum interval between the starts of consecutive requests
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    last_start: Option<Instant>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_start: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next request may start, then record its start
    ///
    /// The first call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_start {
            let next = last + self.delay;
            if next > Instant::now() {
                debug!(
                    delay_ms = next.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "Pacing request"
                );
                tokio::time::sleep_until(next).await;
            }
        }
        self.last_start = Some(Instant::now());
    }
}

/// Client for the PBS data API
pub struct PbsApiClient {
    client: Client,
    config: ApiConfig,
    pacer: RequestPacer,
}

impl PbsApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("pbs-import/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            pacer: RequestPacer::new(config.request_delay()),
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Full request URL; an empty `limit` asks for every record
    pub fn request_url(&self, endpoint: &str, schedule_code: Option<&str>) -> String {
        let mut url = format!("{}?limit=", self.config.endpoint_url(endpoint));
        if let Some(code) = schedule_code {
            url.push_str("&schedule_code=");
            url.push_str(code);
        }
        url
    }
}

#[async_trait]
impl TableSource for PbsApiClient {
    async fn fetch(&mut self, endpoint: &str, schedule_code: Option<&str>) -> Result<FetchOutcome> {
        let url = self.request_url(endpoint, schedule_code);

        self.pacer.wait().await;
        info!(url = %url, "Retrieving");

        let response = self
            .client
            .get(&url)
            .header("Subscription-Key", &self.config.subscription_key)
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(|e| IngestError::transport(&url, e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!(endpoint = %endpoint, status = %status, "No records returned");
            return Ok(FetchOutcome::NoContent);
        }
        if !status.is_success() {
            return Err(IngestError::transport(&url, format!("HTTP {}", status)));
        }

        let (content_encoding, content_type) = {
            let headers = response.headers();
            (header_value(headers, CONTENT_ENCODING), header_value(headers, CONTENT_TYPE))
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| IngestError::transport(&url, e))?;
        let text = pbs_common::decompression::decode_payload(
            &body,
            content_encoding.as_deref(),
            content_type.as_deref(),
        )?;

        let envelope = ApiEnvelope::parse(&text)?;
        let total = envelope.total_records();
        let records = envelope.into_records()?;

        match total {
            Some(total) if total != records.len() as u64 => warn!(
                endpoint = %endpoint,
                total_records = total,
                received = records.len(),
                "Record count differs from _meta.total_records"
            ),
            _ => {},
        }

        info!(endpoint = %endpoint, status = %status, records = records.len(), "Records returned");
        Ok(FetchOutcome::Records(records))
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let client = PbsApiClient::new(ApiConfig::new().with_base_url("http://api.test/v3")).unwrap();
        assert_eq!(client.request_url("schedules", None), "http://api.test/v3/schedules?limit=");
        assert_eq!(
            client.request_url("items", Some("4429")),
            "http://api.test/v3/items?limit=&schedule_code=4429"
        );
    }

    #[test]
    fn test_fetch_outcome() {
        assert!(FetchOutcome::NoContent.is_empty());
        assert!(FetchOutcome::NoContent.into_records().is_empty());
        let outcome = FetchOutcome::Records(vec![Record::new()]);
        assert_eq!(outcome.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_first_request_not_delayed() {
        let mut pacer = RequestPacer::new(Duration::from_secs(20));
        let start = Instant::now();
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_enforces_interval() {
        let mut pacer = RequestPacer::new(Duration::from_secs(20));
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(40));
        assert!(start.elapsed() < Duration::from_secs(41));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_counts_time_already_spent() {
        let mut pacer = RequestPacer::new(Duration::from_secs(20));
        pacer.wait().await;
        tokio::time::sleep(Duration::from_secs(15)).await;

        let before = Instant::now();
        pacer.wait().await;
        let waited = before.elapsed();
        assert!(waited >= Duration::from_secs(5));
        assert!(waited < Duration::from_secs(6));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let before = Instant::now();
        pacer.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
