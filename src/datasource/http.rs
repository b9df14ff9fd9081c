//! HTTP client for the signal service's position API.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{PositionSource, PositionSourceError, PositionStatus};
use crate::domain::{Decimal, PositionId};

/// Position source backed by the signal service's REST API.
#[derive(Debug, Clone)]
pub struct HttpPositionSource {
    client: Client,
    base_url: String,
}

impl HttpPositionSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_json(
        &self,
        url: &str,
    ) -> Result<Option<serde_json::Value>, PositionSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(PositionSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 404 {
                return Ok(None);
            }
            if status == 429 {
                return Err(backoff::Error::transient(PositionSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(PositionSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PositionSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map(Some)
                .map_err(|e| {
                    backoff::Error::permanent(PositionSourceError::ParseError(e.to_string()))
                })
        })
        .await
    }
}

#[async_trait]
impl PositionSource for HttpPositionSource {
    async fn fetch_position(
        &self,
        position_id: &PositionId,
    ) -> Result<Option<PositionStatus>, PositionSourceError> {
        debug!("Fetching position {}", position_id);

        let url = format!("{}/positions/{}", self.base_url, position_id);
        let Some(body) = self.get_json(&url).await? else {
            return Ok(None);
        };

        parse_position_status(&body).map(Some)
    }
}

fn parse_position_status(body: &serde_json::Value) -> Result<PositionStatus, PositionSourceError> {
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PositionSourceError::ParseError("missing status field".to_string()))?;

    let last_price = match body.get("lastPrice") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(Decimal::from_str_canonical(&text).map_err(|e| {
                PositionSourceError::ParseError(format!("bad lastPrice {}: {}", text, e))
            })?)
        }
    };

    Ok(PositionStatus {
        is_open: status == "open",
        last_price,
    })
}
