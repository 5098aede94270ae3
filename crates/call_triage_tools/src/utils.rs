use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use cache::Cache;
use futures::future::{Either, select};
use futures_timer::Delay;
use http_client::{HttpClient, Request, RequestBuilderExt, ResponseAsyncBodyExt};
use serde_json::Value;

/// How outbound calls to third-party providers are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the zero-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

enum Attempt {
    Done(Value),
    Retry(anyhow::Error),
    Fail(anyhow::Error),
}

/// GETs `base_url` with `params` as query string and parses the JSON body.
///
/// Transport errors, timeouts and 5xx answers are retried with exponential
/// backoff; any other non-success status fails straight away.
pub async fn make_request(
    http_client: &Arc<dyn HttpClient>,
    policy: &RetryPolicy,
    base_url: &str,
    params: Option<&Value>,
) -> Result<Value> {
    let url = match params {
        Some(params) => format!("{}?{}", base_url, build_query_string(params)?),
        None => base_url.to_string(),
    };

    let url = url.as_str();
    retry(policy, base_url, move || send_once(http_client, policy, url)).await
}

/// Drives `send` until it succeeds, fails for good or runs out of attempts.
async fn retry<F, Fut>(policy: &RetryPolicy, base_url: &str, mut send: F) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = anyhow!("no request attempted");

    for attempt in 0..attempts {
        match send().await? {
            Attempt::Done(body) => return Ok(body),
            Attempt::Fail(err) => return Err(err),
            Attempt::Retry(err) => {
                log::debug!("Attempt {} for {} failed: {}", attempt + 1, base_url, err);
                last_error = err;
                if attempt + 1 < attempts {
                    Delay::new(policy.backoff(attempt)).await;
                }
            }
        }
    }

    Err(anyhow!(
        "Request to {} failed after {} attempts: {}",
        base_url,
        attempts,
        last_error
    ))
}

async fn send_once(
    http_client: &Arc<dyn HttpClient>,
    policy: &RetryPolicy,
    url: &str,
) -> Result<Attempt> {
    let request = Request::builder()
        .method("GET")
        .uri(url)
        .header("Accept", "application/json")
        .end()?;

    let response = match with_timeout(http_client.send(request), policy.timeout).await {
        None => return Ok(Attempt::Retry(anyhow!("timed out after {:?}", policy.timeout))),
        Some(Err(err)) => return Ok(Attempt::Retry(anyhow!("connection error: {}", err))),
        Some(Ok(response)) => response,
    };

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        return Ok(failed_status(status.as_u16(), error_body));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
    Ok(Attempt::Done(body))
}

/// Server errors are worth another try; any other failure status is final.
fn failed_status(status: u16, body: String) -> Attempt {
    match status {
        500..=599 => Attempt::Retry(anyhow!("HTTP error {}: {}", status, body)),
        429 => Attempt::Fail(anyhow!("Rate limit exceeded by provider")),
        404 => Attempt::Fail(anyhow!("Resource not found: {}", body)),
        _ => Attempt::Fail(anyhow!("HTTP error {}: {}", status, body)),
    }
}

/// Resolves to `None` when `future` does not finish within `timeout`.
pub async fn with_timeout<F: Future>(future: F, timeout: Duration) -> Option<F::Output> {
    match select(Box::pin(future), Box::pin(Delay::new(timeout))).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}

/// Serves `key` from `cache`, or runs `fetch` and stores its result for
/// `ttl`. Returns the value and whether it came from the cache.
///
/// A cache that cannot read or write only costs the extra fetch.
pub async fn cached_json<F, Fut>(
    cache: &Arc<dyn Cache>,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<(Value, bool)>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    if let Some(value) = cache.get(key) {
        log::debug!("Cache hit for {}", key);
        return Ok((value, true));
    }

    let value = fetch().await?;
    if !cache.set(key, value.clone(), Some(ttl)) {
        log::warn!("Failed to store {} in cache", key);
    }

    Ok((value, false))
}

pub(crate) fn build_query_string(params: &Value) -> Result<String> {
    let obj = params
        .as_object()
        .ok_or_else(|| anyhow!("Query parameters must be an object"))?;
    let mut query_parts = Vec::new();

    for (key, value) in obj {
        match value {
            Value::String(s) => {
                query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
            }
            Value::Number(n) => {
                query_parts.push(format!("{}={}", key, n));
            }
            Value::Bool(b) => {
                query_parts.push(format!("{}={}", key, b));
            }
            Value::Array(arr) => {
                let joined = arr
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                query_parts.push(format!("{}={}", key, urlencoding::encode(&joined)));
            }
            _ => {}
        }
    }

    Ok(query_parts.join("&"))
}
