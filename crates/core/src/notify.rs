//! Chat webhook notifications.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::logger;

const TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook URL not configured")]
    MissingUrl,

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook responded with status {code}: {body}")]
    Status { code: u16, body: String },
}

/// POST `{"text": message}` to `hook_url`. Anything other than 200 is an
/// error; there is no retry.
pub fn notify(message: &str, hook_url: &str) -> Result<(), NotifyError> {
    if hook_url.trim().is_empty() {
        return Err(NotifyError::MissingUrl);
    }
    logger::info_p("notify", "sending webhook message");

    let payload = serde_json::json!({ "text": message });
    let resp = reqwest::blocking::Client::builder()
        .timeout(TIMEOUT)
        .build()?
        .post(hook_url)
        .json(&payload)
        .send()?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().unwrap_or_default();
        return Err(NotifyError::Status { code: status.as_u16(), body });
    }
    Ok(())
}
