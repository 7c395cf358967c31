use std::thread;

use thiserror::Error;

use crate::config::HttpSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum HttpFailure {
    #[error("{detail}")]
    Status { status: u16, detail: String },
    #[error("{0}")]
    Transport(String),
}

impl HttpFailure {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404 | 410, .. })
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text_with_retries(
    url: &str,
    settings: &HttpSettings,
) -> Result<String, HttpFailure> {
    let attempts = settings.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(settings.connect_timeout)
        .timeout_read(settings.read_timeout)
        .timeout_write(settings.read_timeout)
        .build();

    for attempt in 1..=attempts {
        match agent.get(url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => return Ok(body),
                Err(err) => {
                    return Err(HttpFailure::Transport(format!(
                        "request failed: response decode failed: {err}"
                    )));
                }
            },
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim();
                let status_error = if body.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    let truncated = body.chars().take(240).collect::<String>();
                    format!("HTTP status {status} ({truncated})")
                };

                if should_retry_http_status(status) && attempt < attempts {
                    thread::sleep(settings.retry_delay);
                    continue;
                }

                let detail = if should_retry_http_status(status) {
                    format!("request failed after {attempts} attempt(s): {status_error}")
                } else {
                    format!("request failed: {status_error}")
                };
                return Err(HttpFailure::Status { status, detail });
            }
            Err(ureq::Error::Transport(err)) => {
                let transport_error = format!("transport error: {err}");
                if attempt < attempts {
                    thread::sleep(settings.retry_delay);
                    continue;
                }
                return Err(HttpFailure::Transport(format!(
                    "request failed after {attempts} attempt(s): {transport_error}"
                )));
            }
        }
    }

    Err(HttpFailure::Transport(
        "request failed: exhausted attempts without a concrete error".to_string(),
    ))
}
