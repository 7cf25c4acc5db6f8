//! The camera's HTTP endpoints: configuration dump and preview JPEG.

use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::X7Error;
use crate::network::CameraEndpoint;

pub const CONFIG_PATH: &str = "/pref/config";
pub const PREVIEW_PATH: &str = "/mjpeg/amba.jpg";

/// Outcome of one preview poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewFetch {
    Frame(Bytes),
    /// The camera answered with an empty body.
    Empty,
    /// No frame this time (404 or timeout). The next tick tries again.
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct CameraHttp {
    client: reqwest::Client,
    base: String,
}

impl CameraHttp {
    /// `read_timeout` is added to `connect_timeout` to bound the whole request.
    pub fn new(
        endpoint: &CameraEndpoint,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, X7Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout + read_timeout)
            .build()?;
        Ok(Self {
            client,
            base: endpoint.http_base(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// `GET /pref/config` as a JSON object.
    pub async fn fetch_config(&self) -> Result<Map<String, Value>, X7Error> {
        let url = self.url(CONFIG_PATH);
        debug!(target: "x7::net", "HTTP GET {url}");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        match serde_json::from_slice::<Value>(&body)? {
            Value::Object(config) => Ok(config),
            other => Err(X7Error::Protocol(format!(
                "camera config is not a JSON object: {other}"
            ))),
        }
    }

    /// `GET /mjpeg/amba.jpg`. Errors other than 404 and timeouts are returned.
    pub async fn fetch_preview(&self) -> Result<PreviewFetch, X7Error> {
        let url = self.url(PREVIEW_PATH);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(PreviewFetch::Unavailable(e.to_string())),
            Err(e) => return Err(e.into()),
        };

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PreviewFetch::Unavailable("preview not found (404)".into()));
        }

        match response.error_for_status()?.bytes().await {
            Ok(body) if body.is_empty() => Ok(PreviewFetch::Empty),
            Ok(body) => Ok(PreviewFetch::Frame(body)),
            Err(e) if e.is_timeout() => Ok(PreviewFetch::Unavailable(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
