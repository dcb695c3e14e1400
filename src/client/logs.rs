//! HTTP log client: blob fetch and live tail.
//!
//! The log service stores step output as JSON lines keyed by an opaque
//! log key. `blob` fetches a completed payload in one call; `tail`
//! consumes the SSE-like stream endpoint until it closes or the run is
//! cancelled. Both print the line content to stdout as it arrives;
//! progress and errors stay on stderr.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{error_from_response, ClientError, ClientResult, LogClient};

/// Header carrying the log-service token.
const TOKEN_HEADER: &str = "x-skyline-log-token";

/// Configuration for the log client.
#[derive(Debug, Clone)]
pub struct LogClientConfig {
    /// Base URL of the log service.
    pub base_url: String,
    /// Connect timeout. No overall timeout is set: tails are long-lived.
    pub connect_timeout: Duration,
}

impl Default for LogClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_LOG_SERVICE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// One line as stored by the log service.
#[derive(Debug, Deserialize)]
struct LogLine {
    #[serde(default)]
    out: String,
}

/// Client for the log service.
pub struct HttpLogClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpLogClient {
    /// Build a client. The token is supplied later via `set_token`.
    pub fn new(config: LogClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    fn token(&self) -> ClientResult<String> {
        self.token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(ClientError::TokenMissing)
    }
}

#[async_trait]
impl LogClient for HttpLogClient {
    fn set_token(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
    }

    async fn blob(&self, _cancel: &CancellationToken, key: &str) -> ClientResult<usize> {
        let token = self.token()?;
        let response = self
            .http
            .get(format!("{}/blob", self.base_url))
            .query(&[("key", key)])
            .header(TOKEN_HEADER, token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        let mut count = 0;
        for line in body.lines() {
            if let Some(out) = parse_log_line(line) {
                println!("{out}");
                count += 1;
            }
        }
        Ok(count)
    }

    async fn tail(&self, cancel: &CancellationToken, key: &str) -> ClientResult<()> {
        let token = self.token()?;
        let response = self
            .http
            .get(format!("{}/stream", self.base_url))
            .query(&[("key", key)])
            .header(TOKEN_HEADER, token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => match chunk {
                    Some(chunk) => {
                        buf.extend_from_slice(&chunk?);
                        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                            let line: Vec<u8> = buf.drain(..=pos).collect();
                            emit(&line);
                        }
                    }
                    None => break,
                },
            }
        }
        if !buf.is_empty() {
            emit(&buf);
        }
        Ok(())
    }
}

fn emit(raw: &[u8]) {
    let line = String::from_utf8_lossy(raw);
    if let Some(out) = parse_log_line(&line) {
        println!("{out}");
    }
}

/// Extract the printable content of one stored line.
///
/// Lines arrive either as bare JSON objects or as SSE `data:` events
/// wrapping the same object. Anything unparseable is passed through
/// verbatim; blank lines and SSE keep-alives yield nothing.
fn parse_log_line(line: &str) -> Option<String> {
    let trimmed = line.trim_end_matches(['\r', '\n']).trim();
    if trimmed.is_empty() {
        return None;
    }
    let payload = trimmed.strip_prefix("data:").map(str::trim).unwrap_or(trimmed);
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogLine>(payload) {
        Ok(parsed) => Some(parsed.out),
        Err(_) => Some(payload.to_string()),
    }
}
