//! Deployment URL health polling.
//!
//! This module provides a bounded-retry liveness check for freshly deployed
//! HTTP services. Provisioning completing does not mean the service is
//! reachable yet, so the poller tolerates transport errors and non-2xx
//! responses up to a fixed attempt budget with a fixed inter-attempt delay.

use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Poller errors.
#[derive(Debug, Error)]
pub enum HealthError {
    /// A 2xx response was received but its body could not be read.
    /// Non-retryable: the service answered, so retrying hides a real problem.
    #[error("failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response was received but the body lacked the expected marker.
    #[error("response from {url} did not contain expected text {marker:?}")]
    MarkerMissing { url: String, marker: String },

    /// No 2xx response was observed within the attempt budget.
    #[error("deployment URL {url} failed to respond with a 2xx status code after {attempts} attempts")]
    NeverHealthy { url: String, attempts: u32 },
}

/// Attempt budget and inter-attempt delay for [`poll_deployment_url`].
///
/// The delay is constant: no exponential backoff, no jitter. The default
/// budget is 60 attempts at 4 second spacing, roughly a four minute ceiling.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of GET attempts.
    pub attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 60,
            delay: Duration::from_secs(4),
        }
    }
}

/// Poll a deployment URL until it serves a 2xx response, then check the body
/// for an expected marker string.
///
/// Per attempt:
/// - transport-level failure (connection refused, DNS, timeout): logged,
///   retried
/// - status in [200, 299]: the body is read in full; a read failure is
///   returned immediately, a missing marker is
///   [`HealthError::MarkerMissing`], a present marker is success. Any 2xx
///   terminates the loop either way; the poller never retries past a 2xx.
/// - any other status: logged, retried
///
/// The fixed delay is applied between attempts only. There is no sleep after
/// the final attempt. Exhausting the budget without ever observing a 2xx
/// returns [`HealthError::NeverHealthy`].
pub async fn poll_deployment_url(
    client: &reqwest::Client,
    url: &str,
    marker: &str,
    config: &PollConfig,
) -> Result<(), HealthError> {
    for attempt in 1..=config.attempts {
        match client.get(url).send().await {
            Err(e) => {
                tracing::warn!(attempt, error = %e, "deployment URL request failed");
            }
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.map_err(|source| HealthError::BodyRead {
                    url: url.to_string(),
                    source,
                })?;

                if body.contains(marker) {
                    return Ok(());
                }

                return Err(HealthError::MarkerMissing {
                    url: url.to_string(),
                    marker: marker.to_string(),
                });
            }
            Ok(response) => {
                tracing::warn!(
                    attempt,
                    status = response.status().as_u16(),
                    "deployment URL responded with non-2xx status"
                );
            }
        }

        // Delay between attempts only; the last attempt has no trailing sleep.
        if attempt < config.attempts {
            sleep(config.delay).await;
        }
    }

    Err(HealthError::NeverHealthy {
        url: url.to_string(),
        attempts: config.attempts,
    })
}
