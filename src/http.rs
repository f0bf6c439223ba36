//! Shared HTTP plumbing for the Ollama and OpenAI clients.
//!
//! Requests are sent once by default. With `max_retries > 0`, HTTP 429,
//! 5xx, and network errors are retried with exponential backoff
//! (1s, 2s, 4s, ... capped at 32s); other 4xx responses fail immediately.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::error::RagError;

pub fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// POST `body` to `url` and return the JSON response, retrying transient
/// failures up to `max_retries` times.
pub async fn post_json_with_retry(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    max_retries: u32,
) -> Result<Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1u64 << (attempt - 1).min(5));
            tracing::warn!(service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json::<Value>().await.map_err(|e| {
                        RagError::service(service, format!("invalid JSON response: {}", e)).into()
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = RagError::service(service, format!("HTTP {}: {}", status, body_text));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }

                // Client error (not 429): fail now
                return Err(err.into());
            }
            Err(e) => {
                last_err = Some(RagError::service(
                    service,
                    format!("request to {} failed: {}", url, e),
                ));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| RagError::service(service, "request failed"))
        .into())
}
