pub mod rate_limit;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Default attempt budget for outbound calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base delay between attempts; the actual delay grows linearly
/// (`base × attempt_number`).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
/// General per-request timeout. Callers with tighter budgets (Jira detail
/// lookups) set their own via `RequestBuilder::timeout`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum NetError {
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("network error after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("request body cannot be cloned for retry")]
    NotCloneable,

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Thin wrapper around `reqwest::Client` that retries network-level failures
/// with linearly increasing backoff. A received response is always returned
/// to the caller, whatever its status — status-code handling belongs to the
/// API clients built on top of this.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, NetError> {
        let inner = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            inner,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    #[cfg(test)]
    pub fn with_retry(max_attempts: u32, base_delay: Duration) -> Result<Self, NetError> {
        let mut client = Self::new()?;
        client.max_attempts = max_attempts;
        client.base_delay = base_delay;
        Ok(client)
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.inner.get(url)
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.inner.post(url)
    }

    /// Send a request exactly once, no retry loop. For callers with their own
    /// latency budget, where backoff would multiply it.
    pub async fn execute_once(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, NetError> {
        match request.send().await {
            Ok(response) => {
                debug!(status = %response.status(), "response received");
                Ok(response)
            }
            Err(source) if source.is_timeout() => Err(NetError::Timeout { attempts: 1 }),
            Err(source) => Err(NetError::Network { attempts: 1, source }),
        }
    }

    /// Send a request, retrying transport failures up to the attempt budget.
    /// Never retries once a response has been received, even a 4xx/5xx one.
    pub async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, NetError> {
        for attempt in 1..=self.max_attempts {
            let builder = request.try_clone().ok_or(NetError::NotCloneable)?;

            match builder.send().await {
                Ok(response) => {
                    debug!(status = %response.status(), attempt, "response received");
                    return Ok(response);
                }
                Err(source) => {
                    let timed_out = source.is_timeout();
                    if attempt < self.max_attempts {
                        let delay = self.base_delay * attempt;
                        warn!(attempt, timed_out, error = %source, delay_ms = delay.as_millis() as u64, "transport failure, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(if timed_out {
                        NetError::Timeout { attempts: attempt }
                    } else {
                        NetError::Network {
                            attempts: attempt,
                            source,
                        }
                    });
                }
            }
        }
        unreachable!("attempt loop always returns")
    }
}
