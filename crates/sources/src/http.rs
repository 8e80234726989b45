//! Shared HTTP plumbing: a client with bounded timeouts and a retry loop
//! with exponential backoff. Transport failures (DNS, connect, read
//! timeout) are retried; HTTP error statuses are not, except 429 which
//! backs off briefly and tries again.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use showtally_core::config::HttpConfig;
use tokio::time::sleep;
use tracing::warn;

use crate::SourceError;

const USER_AGENT: &str = concat!("showtally/", env!("CARGO_PKG_VERSION"));
const BODY_EXCERPT_LEN: usize = 300;

pub fn client(http: &HttpConfig) -> Result<Client, SourceError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .timeout(Duration::from_secs(http.read_timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(SourceError::Client)
}

/// Send the request built by `request`, retrying transport failures up to
/// `retries` extra attempts. `subject` names what was being fetched so the
/// final error is diagnosable on its own.
pub(crate) async fn get_with_retry<F>(
    vendor: &'static str,
    subject: &str,
    retries: u32,
    request: F,
) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        match request().send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS && attempt < retries {
                    warn!(
                        event_name = "source.fetch.rate_limited",
                        vendor,
                        subject,
                        attempt,
                        "rate limited; backing off before retry"
                    );
                    sleep(Duration::from_secs(2 + u64::from(attempt))).await;
                    attempt += 1;
                    continue;
                }
                if status.is_success() {
                    return Ok(response);
                }
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Status {
                    vendor,
                    status: status.as_u16(),
                    subject: subject.to_string(),
                    body_excerpt: excerpt(&body),
                });
            }
            Err(source) => {
                if attempt < retries {
                    warn!(
                        event_name = "source.fetch.transport_retry",
                        vendor,
                        subject,
                        attempt,
                        error = %source,
                        "transport failure; retrying"
                    );
                    sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return Err(SourceError::Transport {
                    vendor,
                    subject: subject.to_string(),
                    attempts: attempt + 1,
                    source,
                });
            }
        }
    }
}

/// 1.5^attempt seconds, the cadence both ticketing vendors tolerate.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(1.5f64.powi(attempt as i32))
}

/// First few hundred characters of an error body, flattened to one line.
fn excerpt(body: &str) -> String {
    let flat = body.replace(['\n', '\r'], " ");
    let mut cut = flat.trim().to_string();
    if cut.len() > BODY_EXCERPT_LEN {
        let mut end = BODY_EXCERPT_LEN;
        while !cut.is_char_boundary(end) {
            end -= 1;
        }
        cut.truncate(end);
    }
    cut
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{backoff_delay, excerpt};

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert!(backoff_delay(1) > backoff_delay(0));
        assert!(backoff_delay(2) > backoff_delay(1));
    }

    #[test]
    fn excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("line one\nline two"), "line one line two");
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), 300);
    }
}
