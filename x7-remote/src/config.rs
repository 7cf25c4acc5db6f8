//! CLI client configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use x7_core::{CameraEndpoint, MemoryStore, SessionConfig, StoredValue};

/// Top-level configuration for the CLI client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Where the camera lives.
    pub network: NetworkConfig,
    /// Protocol timeouts and periods.
    pub timing: TimingConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// Local values of the synchronized settings, by local key.
    pub settings: BTreeMap<String, SettingValue>,
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Camera address on its Wi-Fi network.
    pub host: String,
    /// TCP port of the JSON control API.
    pub control_port: u16,
    /// Port of the camera's HTTP server.
    pub http_port: u16,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reachability attempts for `probe` and `--wait`.
    pub probe_attempts: u32,
    /// Pause between reachability attempts in milliseconds.
    pub probe_delay_ms: u64,
}

/// Timing settings, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub reply_timeout_ms: u64,
    pub close_timeout_ms: u64,
    pub quiescence_ms: u64,
    pub keep_alive_interval_ms: u64,
    pub http_connect_timeout_ms: u64,
    pub http_read_timeout_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive, e.g. `info,x7::net=debug`.
    pub level: String,
}

/// A setting value as written in TOML: `true` / `false` or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Text(String),
}

impl From<SettingValue> for StoredValue {
    fn from(value: SettingValue) -> Self {
        match value {
            SettingValue::Flag(b) => StoredValue::Flag(b),
            SettingValue::Text(s) => StoredValue::Text(s),
        }
    }
}

impl From<StoredValue> for SettingValue {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Flag(b) => SettingValue::Flag(b),
            StoredValue::Text(s) => SettingValue::Text(s),
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        let endpoint = CameraEndpoint::default();
        Self {
            host: endpoint.host,
            control_port: endpoint.control_port,
            http_port: endpoint.http_port,
            connect_timeout_ms: 2000,
            probe_attempts: 5,
            probe_delay_ms: 1000,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            reply_timeout_ms: session.reply_timeout_ms,
            close_timeout_ms: session.close_timeout_ms,
            quiescence_ms: session.quiescence_ms,
            keep_alive_interval_ms: session.keep_alive_interval_ms,
            http_connect_timeout_ms: session.http_connect_timeout_ms,
            http_read_timeout_ms: session.http_read_timeout_ms,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl RemoteConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn endpoint(&self) -> CameraEndpoint {
        CameraEndpoint::new(
            self.network.host.clone(),
            self.network.control_port,
            self.network.http_port,
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.endpoint(),
            connect_timeout_ms: self.network.connect_timeout_ms,
            reply_timeout_ms: self.timing.reply_timeout_ms,
            close_timeout_ms: self.timing.close_timeout_ms,
            quiescence_ms: self.timing.quiescence_ms,
            keep_alive_interval_ms: self.timing.keep_alive_interval_ms,
            http_connect_timeout_ms: self.timing.http_connect_timeout_ms,
            http_read_timeout_ms: self.timing.http_read_timeout_ms,
        }
    }

    /// A local store holding the `[settings]` section.
    pub fn seed_store(&self) -> MemoryStore {
        MemoryStore::with_values(
            self.settings
                .iter()
                .map(|(key, value)| (key.clone(), StoredValue::from(value.clone()))),
        )
    }
}

/// Render a store as a `[settings]` section ready to paste into the config.
pub fn render_settings(store: &MemoryStore) -> Result<String, toml::ser::Error> {
    #[derive(Serialize)]
    struct Section {
        settings: BTreeMap<String, SettingValue>,
    }

    let settings = store
        .snapshot()
        .into_iter()
        .map(|(key, value)| (key, SettingValue::from(value)))
        .collect();
    toml::to_string_pretty(&Section { settings })
}

// ── Tests ────────────────────────────────────────────────────────
