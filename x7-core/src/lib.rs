//! # x7-core
//!
//! Client-side session engine for the X7 action camera remote protocol.
//!
//! This crate contains:
//! - **Commands**: `Command`, `SettingVerb`, `ReplyMode` with their wire codes
//! - **Messages**: `Request` / `Reply` JSON records
//! - **Codec**: `CameraCodec` splitting NUL-separated replies via `tokio_util`
//! - **Network**: `Transport` for the camera's TCP socket, plus a reachability `probe`
//! - **HTTP**: `CameraHttp` for `/pref/config` and the preview JPEG
//! - **State**: `ConnectionPhase` with validated transitions
//! - **Session**: `Session` running the handshake, keep-alive, preview and shutdown
//! - **Settings**: key map, `SettingsStore` and pull/push synchronization
//! - **Events**: `EventBus` fan-out of session notifications
//! - **Error**: `X7Error`, a `thiserror`-based error hierarchy

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod message;
pub mod network;
pub mod preview;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod state;
pub mod status;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{CameraCodec, MAX_READ_SIZE, ReplyBatch, SKIP_LIST};
pub use command::{Command, ReplyMode, SettingVerb};
pub use config::SessionConfig;
pub use error::X7Error;
pub use events::{EventBus, SessionEvent, SubscriptionId};
pub use http::{CameraHttp, PreviewFetch};
pub use message::{Reply, Request, SessionToken};
pub use network::{CameraEndpoint, Transport, probe};
pub use preview::{IDLE_PREVIEW_PERIOD, PreviewFrame, RECORDING_PREVIEW_PERIOD};
pub use scheduler::{PeriodicTask, Tick};
pub use session::{KEEP_ALIVE_RVAL, Session, SessionContext};
pub use settings::{
    DefaultKeys, KeyResolver, MemoryStore, SettingMap, SettingsRemote, SettingsStore, StoredValue,
    SyncDirection,
};
pub use state::{ConnectionPhase, ConnectionState};
pub use status::{BatteryLevel, CameraStatus};
