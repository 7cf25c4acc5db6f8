//! Session tuning: endpoint, timeouts and periods.
//!
//! Defaults are the values the camera protocol expects; tests and the CLI
//! shorten some of them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::CameraEndpoint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub endpoint: CameraEndpoint,
    /// TCP connect timeout.
    pub connect_timeout_ms: u64,
    /// Read timeout for every reply.
    pub reply_timeout_ms: u64,
    /// Read timeout for the final `Session_Close`.
    pub close_timeout_ms: u64,
    /// Pause after the socket is closed, before `Disconnected` is announced.
    pub quiescence_ms: u64,
    pub keep_alive_interval_ms: u64,
    pub http_connect_timeout_ms: u64,
    pub http_read_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: CameraEndpoint::default(),
            connect_timeout_ms: 2000,
            reply_timeout_ms: 5000,
            close_timeout_ms: 500,
            quiescence_ms: 500,
            keep_alive_interval_ms: 4500,
            http_connect_timeout_ms: 1000,
            http_read_timeout_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn with_endpoint(endpoint: CameraEndpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.http_connect_timeout_ms)
    }

    pub fn http_read_timeout(&self) -> Duration {
        Duration::from_millis(self.http_read_timeout_ms)
    }
}
