//! Single-shot HTTP helpers shared by the provider clients.
//!
//! Every provider call goes through [`send_json`], which applies the
//! provider's time budget, maps timeouts and non-success statuses into
//! [`ProviderError`], and logs a body preview when JSON decoding fails.
//! Requests are sent exactly once.

use std::time::Duration;

use crate::ProviderError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends a request and parses the response body as JSON.
///
/// # Errors
///
/// Returns [`ProviderError::Timeout`] if the budget elapses,
/// [`ProviderError::Status`] for non-2xx responses, and
/// [`ProviderError::Parse`] if the body is not valid JSON.
pub async fn send_json(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, ProviderError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify(provider, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| classify(provider, timeout, e))?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "{provider}: JSON parse failed: {e}\n  received: {} bytes\n  body preview: {}",
            text.len(),
            preview(&text),
        );
        ProviderError::Parse {
            message: format!("{provider} returned invalid JSON: {e}"),
        }
    })
}

/// Maps a transport error to [`ProviderError`], separating timeouts.
fn classify(provider: &'static str, timeout: Duration, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { provider, timeout }
    } else {
        ProviderError::Http(e)
    }
}

/// Truncates a body to [`BODY_PREVIEW_LEN`] characters for logging.
fn preview(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
