//! Readiness probing for the remote-debugging endpoint.
//!
//! The embedding browser starts asynchronously relative to this process,
//! so the endpoint may not be listening yet. Bounded polling with a fixed
//! interval is the whole strategy; any HTTP success means ready.

use std::time::Duration;

use tokio::time::sleep;

use crate::errors::{AutofillError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `{base_url}/json/version` until it answers with an HTTP success,
/// retrying every `interval` up to `max_attempts` times.
pub async fn wait_until_ready(
    client: &reqwest::Client,
    base_url: &str,
    max_attempts: u32,
    interval: Duration,
) -> Result<()> {
    let url = format!("{}/json/version", base_url);

    for attempt in 1..=max_attempts {
        match client.get(&url).timeout(REQUEST_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(attempt = attempt, "debugging endpoint is ready");
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    attempt = attempt,
                    status = %response.status(),
                    "endpoint answered but is not ready"
                );
            }
            Err(e) => {
                tracing::debug!(attempt = attempt, error = %e, "endpoint not reachable yet");
            }
        }

        tracing::info!(
            "waiting for debugging endpoint... ({}/{})",
            attempt,
            max_attempts
        );
        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    Err(AutofillError::Timeout("endpoint not available".to_string()))
}
