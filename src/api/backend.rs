//! Backend client
//!
//! Talks to the two site endpoints the player core depends on:
//! - `POST /api/extract-iqiyi-m3u8` exchanges a play-page URL for playlist text
//! - `POST /api/update-watch-progress` stores watch progress
//!
//! The seams the lifecycle controller calls through are traits, so tests and
//! offline runs can swap the HTTP client out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlayerError;
use crate::models::ProgressSample;

/// Exchanges an opaque source URL for inline playlist text
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(&self, source_url: &str) -> Result<String, PlayerError>;
}

/// Receives watch-progress reports
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, sample: &ProgressSample) -> Result<(), PlayerError>;
}

/// Downloads subtitle text
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, PlayerError>;
}

/// Extraction request body
#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    iqiyi_play_url: &'a str,
}

/// Extraction response body
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, alias = "playlistText", alias = "playlist_text")]
    m3u8_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Progress request body, in the backend's field names
#[derive(Debug, Serialize)]
struct ProgressRequest {
    episode_id: u64,
    watch_time: f64,
    total_duration: f64,
    completed: bool,
}

impl From<&ProgressSample> for ProgressRequest {
    fn from(sample: &ProgressSample) -> Self {
        Self {
            episode_id: sample.episode_id,
            watch_time: sample.position_seconds,
            total_duration: sample.duration_seconds,
            completed: sample.completed,
        }
    }
}

/// Progress response body
#[derive(Debug, Deserialize)]
struct ProgressResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the site backend
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
    extraction_timeout: Duration,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            extraction_timeout: Duration::from_secs(30),
        }
    }

    /// Override the extraction request timeout
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange a play-page URL for playlist text
    ///
    /// Timeouts and connection failures are transport errors. A response
    /// with `success: false`, an unreadable body or an empty playlist is an
    /// extraction failure.
    pub async fn extract_playlist(&self, source_url: &str) -> Result<String, PlayerError> {
        let url = format!("{}/api/extract-iqiyi-m3u8", self.base_url);
        tracing::info!(source = %truncate(source_url, 100), "requesting playlist extraction");

        let response = self
            .client
            .post(&url)
            .timeout(self.extraction_timeout)
            .json(&ExtractRequest {
                iqiyi_play_url: source_url,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: ExtractResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            // Gateway pages from a struggling server are worth one more try
            Err(_) if status.is_server_error() => {
                return Err(PlayerError::Transport(format!(
                    "extraction endpoint returned HTTP {}",
                    status
                )))
            }
            Err(e) => {
                return Err(PlayerError::Extraction(format!(
                    "unreadable response (HTTP {}): {}",
                    status, e
                )))
            }
        };

        if !body.success {
            let reason = body
                .error
                .unwrap_or_else(|| format!("backend reported failure (HTTP {})", status));
            return Err(PlayerError::Extraction(reason));
        }

        match body.m3u8_content {
            Some(playlist) if !playlist.trim().is_empty() => {
                tracing::debug!(bytes = playlist.len(), "playlist extracted");
                Ok(playlist)
            }
            _ => Err(PlayerError::Extraction("empty playlist".to_string())),
        }
    }

    /// Store a watch-progress sample
    pub async fn update_progress(&self, sample: &ProgressSample) -> Result<(), PlayerError> {
        let url = format!("{}/api/update-watch-progress", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ProgressRequest::from(sample))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlayerError::Transport(format!(
                "progress endpoint returned HTTP {}",
                status
            )));
        }

        let body: ProgressResponse = response
            .json()
            .await
            .map_err(|e| PlayerError::Rejected(format!("unreadable response: {}", e)))?;

        if body.success {
            Ok(())
        } else {
            Err(PlayerError::Rejected(
                body.message.unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }
}

#[async_trait]
impl ExtractionBackend for BackendClient {
    async fn extract(&self, source_url: &str) -> Result<String, PlayerError> {
        self.extract_playlist(source_url).await
    }
}

#[async_trait]
impl ProgressSink for BackendClient {
    async fn report(&self, sample: &ProgressSample) -> Result<(), PlayerError> {
        self.update_progress(sample).await
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
