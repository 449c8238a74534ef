//! Record and sprite source.
//!
//! The round engine only sees [`RecordSource`]. [`HttpRecordSource`] talks to
//! the hosted creature API; tests substitute in-memory stubs.

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use super::error::UpstreamError;
use super::record::Record;
use crate::config::ApiConfig;

/// Attachment name the challenge embed points at.
pub const SPRITE_FILE_NAME: &str = "djs-gtp.png";

/// Opaque image reference handed to the presenter. Not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub url: String,
    pub file_name: String,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_record(&self, id: u32) -> Result<Record, UpstreamError>;

    /// Sprite for `id`; `revealed == false` yields the concealed silhouette.
    async fn fetch_sprite(&self, id: u32, revealed: bool) -> Result<Sprite, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Record source backed by the hosted HTTP API.
pub struct HttpRecordSource {
    base_url: String,
    key: String,
    client: reqwest::Client,
}

impl HttpRecordSource {
    pub fn new(config: &ApiConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            client,
        })
    }

    pub fn info_url(&self, id: u32) -> Result<Url, UpstreamError> {
        let id = id.to_string();
        self.endpoint("image/pokemoninfo", &[("id", id.as_str()), ("key", self.key.as_str())])
    }

    pub fn sprite_url(&self, id: u32, revealed: bool) -> Result<Url, UpstreamError> {
        let id = id.to_string();
        let show = if revealed { "true" } else { "false" };
        self.endpoint(
            "image/pokemonimage",
            &[("id", id.as_str()), ("show", show), ("key", self.key.as_str())],
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        Url::parse_with_params(&format!("{}/{}", self.base_url, path), params)
            .map_err(|e| UpstreamError::Url(e.to_string()))
    }
}

/// Map a non-success response to `Status`, preferring the API's own `message`.
fn status_error(status: StatusCode, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.as_u16().to_string());
    UpstreamError::Status { status_code: status.as_u16(), message }
}

fn decode_record(body: &str) -> Result<Record, UpstreamError> {
    serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_record(&self, id: u32) -> Result<Record, UpstreamError> {
        let url = self.info_url(id)?;
        trace!("Fetching record {}", id);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = status_error(status, &body);
            debug!("Record {} fetch failed: {}", id, err);
            return Err(err);
        }
        decode_record(&body)
    }

    async fn fetch_sprite(&self, id: u32, revealed: bool) -> Result<Sprite, UpstreamError> {
        // The presenter downloads the attachment itself; only the reference is built here.
        Ok(Sprite {
            url: self.sprite_url(id, revealed)?.to_string(),
            file_name: SPRITE_FILE_NAME.to_string(),
        })
    }
}
