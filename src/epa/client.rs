//! EPA AQS HTTP client with retry and rate-limit backoff.

use super::response::{parse_annual_response, AnnualRow};
use super::{AnnualQuery, FetchError, MeasurementSource};
use crate::config::{Credentials, Settings};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry schedule for a single AQS request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base of the `2^attempt` wait after HTTP 429.
    pub rate_limit_base: Duration,
    /// Wait after any other failed attempt.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_base: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn rate_limit_wait(&self, attempt: u32) -> Duration {
        self.rate_limit_base * 2u32.saturating_pow(attempt)
    }
}

/// Run `op` until it succeeds or the policy is exhausted. The last error wins.
/// API-reported failures and undecodable bodies are returned at once.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.max_retries.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(FetchError::RateLimited) => {
                let wait = policy.rate_limit_wait(attempt);
                warn!("Rate limited. Waiting {:?}...", wait);
                last_error = Some(FetchError::RateLimited);
                tokio::time::sleep(wait).await;
            }
            Err(e @ (FetchError::Api(_) | FetchError::Decode(_))) => return Err(e),
            Err(e) => {
                warn!("Request failed (attempt {}/{}): {}", attempt + 1, attempts, e);
                last_error = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or(FetchError::RateLimited))
}

/// `MeasurementSource` backed by the live AQS API.
#[derive(Debug, Clone)]
pub struct AqsClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl AqsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            policy,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let policy = RetryPolicy {
            max_retries: settings.max_retries(),
            ..RetryPolicy::default()
        };
        Self::new(settings.api_base.clone(), settings.request_timeout, policy)
    }

    async fn request_once(
        &self,
        credentials: &Credentials,
        query: &AnnualQuery,
    ) -> Result<Vec<AnnualRow>, FetchError> {
        let url = format!("{}/annualData/byCounty", self.base_url);
        let (bdate, edate) = query.date_range();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("email", credentials.email.as_str()),
                ("key", credentials.api_key.as_str()),
                ("param", query.parameter_code.as_str()),
                ("bdate", bdate.as_str()),
                ("edate", edate.as_str()),
                ("state", query.state_code.as_str()),
                ("county", query.county_code.as_str()),
            ])
            .send()
            .await
            .map_err(without_url)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        let body = response.text().await.map_err(without_url)?;
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: redact(&body, &credentials.api_key),
            });
        }

        parse_annual_response(&body).map_err(|e| match e {
            FetchError::Api(detail) => FetchError::Api(redact(&detail, &credentials.api_key)),
            other => other,
        })
    }
}

// The request URL carries the API key in its query string.
fn without_url(e: reqwest::Error) -> FetchError {
    FetchError::Http(e.without_url())
}

/// Blank out every occurrence of `secret` in text that ends up in errors or logs.
fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "[redacted]")
}

#[async_trait]
impl MeasurementSource for AqsClient {
    async fn fetch_annual(
        &self,
        credentials: &Credentials,
        query: &AnnualQuery,
    ) -> Result<Vec<AnnualRow>, FetchError> {
        debug!(
            "GET annualData/byCounty param={} state={} county={} year={}",
            query.parameter_code, query.state_code, query.county_code, query.year
        );
        with_retries(&self.policy, |_| self.request_once(credentials, query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            rate_limit_base: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retries(&instant_policy(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(FetchError::Status {
                        status: 500,
                        body: "boom".into(),
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&instant_policy(2), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(FetchError::Status {
                    status: 500,
                    body: format!("attempt {}", attempt),
                })
            }
        })
        .await;
        match result {
            Err(FetchError::Status { body, .. }) => assert_eq!(body, "attempt 1"),
            other => panic!("expected Status, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn api_and_decode_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&instant_policy(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::Api("Invalid key".into())) }
        })
        .await;
        assert!(matches!(result, Err(FetchError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&instant_policy(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::from(serde_json::from_str::<u8>("{").unwrap_err())) }
        })
        .await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn secrets_are_redacted() {
        let body = "https://aqs.epa.gov/data/api/annualData/byCounty?email=a@b.org&key=TOPSECRET";
        let cleaned = redact(body, "TOPSECRET");
        assert!(!cleaned.contains("TOPSECRET"));
        assert!(cleaned.ends_with("key=[redacted]"));
        assert_eq!(redact("nothing here", ""), "nothing here");
    }

    #[tokio::test]
    async fn connection_errors_do_not_leak_the_key() {
        let client = AqsClient::new("http://127.0.0.1:1", Duration::from_secs(2), instant_policy(1)).unwrap();
        let credentials = Credentials {
            email: "analyst@example.org".into(),
            api_key: "TOPSECRETKEY".into(),
        };
        let query = AnnualQuery::new("06", "037", crate::data::Pollutant::Pm25, 2020);

        let err = client.fetch_annual(&credentials, &query).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(!err.to_string().contains("TOPSECRETKEY"));
    }

    #[tokio::test]
    async fn persistent_rate_limit_is_an_error() {
        let result: Result<(), _> =
            with_retries(&instant_policy(3), |_| async { Err(FetchError::RateLimited) }).await;
        assert!(matches!(result, Err(FetchError::RateLimited)));
    }

    #[test]
    fn rate_limit_wait_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_wait(0), Duration::from_secs(1));
        assert_eq!(policy.rate_limit_wait(2), Duration::from_secs(4));
    }
}
