//! Low-level HTTP client — `CryptoCompareHttp`.
//!
//! One logical call to the min-api with the rate-limit retry loop baked in.
//! Endpoint knowledge (paths, wire types) lives in the layers above; this
//! client only knows how to issue a relative query and unwrap the payload
//! envelope.

use crate::error::RemoteError;
use crate::http::retry::{RateLimitBackoff, RATE_LIMIT_MSG};
use crate::http::ApiQuery;

use async_lock::RwLock;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Low-level HTTP client for the CryptoCompare min-api.
#[derive(Clone)]
pub struct CryptoCompareHttp {
    base_url: String,
    client: Client,
    /// Optional API key; absent means unauthenticated calls.
    api_key: Arc<RwLock<Option<String>>>,
    backoff: RateLimitBackoff,
}

impl CryptoCompareHttp {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .user_agent("cryptocompare-sdk")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            api_key: Arc::new(RwLock::new(None)),
            backoff: RateLimitBackoff::default(),
        }
    }

    /// Like [`Self::new`] but with the API key seeded up front.
    pub fn with_api_key(base_url: &str, api_key: Option<String>) -> Self {
        let mut http = Self::new(base_url);
        http.api_key = Arc::new(RwLock::new(api_key));
        http
    }

    /// Like [`Self::new`] but with a custom rate-limit retry schedule.
    pub fn with_backoff(base_url: &str, backoff: RateLimitBackoff) -> Self {
        let mut http = Self::new(base_url);
        http.backoff = backoff;
        http
    }

    /// Set or replace the API key used for subsequent queries.
    pub async fn set_api_key(&self, key: Option<String>) {
        *self.api_key.write().await = key;
    }

    pub async fn has_api_key(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    async fn build_url(&self, path: &str) -> String {
        let mut url = format!("{}/{}", self.base_url, path);
        if let Some(key) = self.api_key.read().await.as_ref() {
            let sep = if path.contains('?') { '&' } else { '?' };
            url.push(sep);
            url.push_str("api_key=");
            url.push_str(key);
        }
        url
    }
}

#[async_trait]
impl ApiQuery for CryptoCompareHttp {
    async fn api_query(&self, path: &str) -> Result<Value, RemoteError> {
        let url = self.build_url(path).await;
        let mut attempt: u32 = 0;

        loop {
            tracing::debug!(url = %url, "querying cryptocompare");
            // Connection failures are not retried; only the rate-limit signal is.
            let response = self.client.get(&url).send().await?;
            let body = response.text().await?;

            let json: Value = serde_json::from_str(&body)
                .map_err(|_| RemoteError::InvalidJson { body: body.clone() })?;

            let message = json.get("Message").and_then(Value::as_str);
            if message == Some(RATE_LIMIT_MSG) {
                if attempt < self.backoff.max_retries {
                    attempt += 1;
                    let delay = self.backoff.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        "rate limited by cryptocompare, backing off"
                    );
                    futures_timer::Delay::new(delay).await;
                    continue;
                }
                tracing::debug!(
                    retries = self.backoff.max_retries,
                    "still rate limited after exhausting the retry budget"
                );
                // Fall through: report whatever the payload says instead of
                // looping forever.
            }

            let status = json.get("Response").and_then(Value::as_str).unwrap_or("Success");
            if status != "Success" {
                let mut error_message = format!("failed to query cryptocompare for \"{url}\"");
                if let Some(msg) = message {
                    error_message.push_str(&format!(". Error: {msg}"));
                }
                tracing::error!(url = %url, error = %error_message, "cryptocompare query failure");
                return Err(RemoteError::Rejected {
                    message: error_message,
                });
            }

            return Ok(match json.get("Data") {
                Some(data) => data.clone(),
                None => json,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal local HTTP server answering every request with the same JSON
    /// body, counting the requests it saw.
    fn spawn_canned_server(body: String) -> (std::net::SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let server_hits = hits.clone();
        std::thread::spawn(move || {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                server_hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (addr, hits)
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries_then_reports_rejection() {
        let body = format!(r#"{{"Response":"Error","Message":"{RATE_LIMIT_MSG}"}}"#);
        let (addr, hits) = spawn_canned_server(body);

        // Millisecond-scale schedule so exhausting the full budget is fast.
        let http = CryptoCompareHttp::with_backoff(
            &format!("http://{addr}"),
            RateLimitBackoff {
                max_retries: 10,
                base: Duration::from_millis(5),
            },
        );

        let err = http.api_query("price?fsym=BTC&tsyms=USD").await.unwrap_err();
        match err {
            RemoteError::Rejected { message } => {
                assert!(message.contains(RATE_LIMIT_MSG), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        // One initial request plus exactly ten retries.
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_non_rate_limit_rejection_is_not_retried() {
        let body = r#"{"Response":"Error","Message":"fsym param seems to be missing"}"#;
        let (addr, hits) = spawn_canned_server(body.to_string());

        let http = CryptoCompareHttp::with_backoff(
            &format!("http://{addr}"),
            RateLimitBackoff {
                max_retries: 10,
                base: Duration::from_millis(5),
            },
        );

        let err = http.api_query("price").await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_key_appended_with_correct_separator() {
        let http = CryptoCompareHttp::new("https://example.com/data/");
        assert_eq!(
            http.build_url("price?fsym=BTC&tsyms=USD").await,
            "https://example.com/data/price?fsym=BTC&tsyms=USD"
        );

        http.set_api_key(Some("secret".to_string())).await;
        assert_eq!(
            http.build_url("price?fsym=BTC&tsyms=USD").await,
            "https://example.com/data/price?fsym=BTC&tsyms=USD&api_key=secret"
        );
        assert_eq!(
            http.build_url("stats").await,
            "https://example.com/data/stats?api_key=secret"
        );
    }
}
