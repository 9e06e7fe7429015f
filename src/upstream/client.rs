//! HTTP client for the Mandrill `tags/list.json` endpoint
//!
//! One POST per call, carrying the API key in the JSON body. There is no
//! retry and no caching; every scrape sees a fresh response.

use crate::error::UpstreamError;
use crate::types::TagStatistic;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Source of per-tag statistics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagStatisticsSource: Send + Sync {
    /// Fetch the current statistics for every tag
    async fn fetch_tag_statistics(&self) -> Result<Vec<TagStatistic>, UpstreamError>;
}

/// Error object Mandrill returns alongside a non-2xx status
#[derive(Debug, Deserialize)]
struct MandrillErrorBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// Mandrill API client
pub struct MandrillClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl MandrillClient {
    /// Create a client for the given endpoint and API key
    ///
    /// The key is not validated locally; an empty key is sent as-is and
    /// rejected by Mandrill.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TagStatisticsSource for MandrillClient {
    async fn fetch_tag_statistics(&self) -> Result<Vec<TagStatistic>, UpstreamError> {
        debug!(url = %self.url, "Fetching tag statistics");

        let response = self
            .client
            .post(&self.url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .body(json!({ "key": self.api_key }).to_string())
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport {
                message: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            let (name, message) = match serde_json::from_slice::<MandrillErrorBody>(&body) {
                Ok(err) => (err.name, err.message),
                Err(_) => (
                    status.canonical_reason().unwrap_or("Unknown").to_string(),
                    String::from_utf8_lossy(&body).chars().take(200).collect(),
                ),
            };
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                name,
                message,
            });
        }

        let stats = parse_tag_statistics(&body)?;
        debug!(tags = stats.len(), "Fetched tag statistics");
        Ok(stats)
    }
}

/// Decode a `tags/list.json` response body
///
/// Keys are matched case-insensitively and `null` values count as absent,
/// so `{"Tag": "welcome", "Sent": 100}` decodes like its lowercase form.
/// Only structurally invalid JSON or a wrongly typed field is an error.
pub fn parse_tag_statistics(body: &[u8]) -> Result<Vec<TagStatistic>, UpstreamError> {
    let records: Option<Vec<Map<String, Value>>> =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Parse {
            message: e.to_string(),
        })?;

    records
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let normalized: Map<String, Value> = record
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key.to_ascii_lowercase(), value))
                .collect();

            serde_json::from_value(Value::Object(normalized)).map_err(|e| UpstreamError::Parse {
                message: format!("record {}: {}", index, e),
            })
        })
        .collect()
}
