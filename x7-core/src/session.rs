//! The camera session: handshake, serialized exchanges, background ticks
//! and shutdown.
//!
//! A [`Session`] owns the only socket to the camera. On-demand commands,
//! the keep-alive tick and the settings synchronizer all go through one
//! write-then-read critical section, so at most one request is outstanding.
//! State changes that are announced to subscribers happen under an
//! emission gate: the flag and its event are observed together and in
//! order.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::{Command, ReplyMode};
use crate::config::SessionConfig;
use crate::error::X7Error;
use crate::events::{EventBus, SessionEvent};
use crate::http::{CameraHttp, PreviewFetch};
use crate::message::{Reply, Request, SessionToken};
use crate::network::Transport;
use crate::preview::{PreviewFrame, preview_period};
use crate::scheduler::{PeriodicTask, Tick};
use crate::settings::{DefaultKeys, KeyResolver, SettingMap, SettingsRemote, SettingsStore, synchronize};
use crate::state::{ConnectionPhase, ConnectionState};
use crate::status::CameraStatus;

/// Return value the camera sends for a healthy keep-alive.
pub const KEEP_ALIVE_RVAL: i64 = -26;

const DUAL_STREAMS: &str = "dual streams";
const STREAM_TYPE: &str = "stream type";
const STREAMING_OFF: &str = "streaming;off";

// ── SessionContext ───────────────────────────────────────────────

/// The collaborators a session works with.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<dyn SettingsStore>,
    pub events: EventBus,
    pub keys: Arc<dyn KeyResolver>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SettingsStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            keys: Arc::new(DefaultKeys),
        }
    }

    pub fn with_keys(mut self, keys: Arc<dyn KeyResolver>) -> Self {
        self.keys = keys;
        self
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to one camera session. Clones share the same session.
///
/// A session is never reused: once it is `Disconnected`, connect again
/// with [`Session::connect`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("token", &self.token())
            .field("recording", &self.is_recording())
            .finish()
    }
}

impl Session {
    /// Run the full handshake and return a connected session.
    ///
    /// Any failure tears the half-open session down, announces
    /// `Disconnected` with the reason and returns [`X7Error::Connection`].
    pub async fn connect(config: SessionConfig, ctx: SessionContext) -> Result<Self, X7Error> {
        let http = CameraHttp::new(
            &config.endpoint,
            config.http_connect_timeout(),
            config.http_read_timeout(),
        )
        .map_err(X7Error::into_connection)?;

        let inner = Arc::new(SessionInner {
            config,
            events: ctx.events.clone(),
            store: ctx.store.clone(),
            http,
            link: tokio::sync::Mutex::new(None),
            token: AtomicU32::new(0),
            phase: Mutex::new(ConnectionPhase::default()),
            recording: AtomicBool::new(false),
            preview_supported: AtomicBool::new(false),
            preview_period: Mutex::new(None),
            gate: Mutex::new(()),
            keep_alive: Mutex::new(None),
            preview: Mutex::new(None),
            shutdown_lock: tokio::sync::Mutex::new(()),
        });

        match inner.handshake(ctx.keys.as_ref()).await {
            Ok(()) => Ok(Self { inner }),
            Err(e) => {
                error!("connect failed: {e}");
                inner.shutdown(Some(e.to_string())).await;
                Err(e.into_connection())
            }
        }
    }

    /// Normal shutdown. Does nothing if the session is already down.
    pub async fn close(&self) {
        self.inner.shutdown(None).await;
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn start_recording(&self) -> Result<(), X7Error> {
        self.set_recording(Command::VideoCaptureStart, true).await
    }

    pub async fn stop_recording(&self) -> Result<(), X7Error> {
        self.set_recording(Command::VideoCaptureStop, false).await
    }

    pub async fn snapshot(&self) -> Result<(), X7Error> {
        self.inner.ensure_connected()?;
        let result = self.inner.command_expect(Command::TakePicture, 0).await;
        self.inner.escalate(result).await.map(|_| ())
    }

    /// Send `Power_OFF` without waiting for an answer, then close.
    pub async fn power_off(&self) -> Result<(), X7Error> {
        self.inner.ensure_connected()?;
        let request = Request::command(self.token(), Command::PowerOff);
        let result = self.inner.exchange(&request, ReplyMode::Ignore).await;
        self.inner.escalate(result).await?;
        self.inner.shutdown(None).await;
        Ok(())
    }

    /// Read one setting from the camera.
    pub async fn get_setting(&self, key: &str) -> Result<String, X7Error> {
        self.inner.ensure_connected()?;
        let result = SettingsRemote::get_setting(&*self.inner, key).await;
        self.inner.escalate(result).await
    }

    async fn set_recording(&self, command: Command, recording: bool) -> Result<(), X7Error> {
        self.inner.ensure_connected()?;
        let result = self.inner.command_expect(command, 0).await;
        self.inner.escalate(result).await?;

        let _gate = self.inner.gate();
        self.inner.recording.store(recording, Ordering::SeqCst);
        self.inner
            .events
            .emit(&SessionEvent::RecordingChanged(recording));
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.inner.phase().state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.phase().is_connected()
    }

    pub fn connected_duration(&self) -> Option<Duration> {
        self.inner.phase().connected_duration()
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::SeqCst)
    }

    pub fn can_snapshot(&self) -> bool {
        !self.is_recording()
    }

    pub fn can_change_settings(&self) -> bool {
        !self.is_recording()
    }

    pub fn is_preview_supported(&self) -> bool {
        self.inner.preview_supported.load(Ordering::SeqCst)
    }

    /// Token assigned by the camera; `0` before pairing.
    pub fn token(&self) -> SessionToken {
        self.inner.token()
    }

    /// Poll period chosen when preview was enabled.
    pub fn preview_period(&self) -> Option<Duration> {
        *lock(&self.inner.preview_period)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

// ── SessionInner ─────────────────────────────────────────────────

struct SessionInner {
    config: SessionConfig,
    events: EventBus,
    store: Arc<dyn SettingsStore>,
    http: CameraHttp,
    /// The socket; the lock is the exchange critical section.
    link: tokio::sync::Mutex<Option<Transport>>,
    token: AtomicU32,
    phase: Mutex<ConnectionPhase>,
    recording: AtomicBool,
    preview_supported: AtomicBool,
    preview_period: Mutex<Option<Duration>>,
    /// Held while an announced change is applied and emitted.
    gate: Mutex<()>,
    keep_alive: Mutex<Option<PeriodicTask>>,
    preview: Mutex<Option<PeriodicTask>>,
    shutdown_lock: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum StreamConfig {
    AlreadyOn,
    Activated,
    Rejected,
}

impl SessionInner {
    fn gate(&self) -> MutexGuard<'_, ()> {
        lock(&self.gate)
    }

    fn phase(&self) -> MutexGuard<'_, ConnectionPhase> {
        lock(&self.phase)
    }

    fn token(&self) -> SessionToken {
        self.token.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), X7Error> {
        if self.phase().is_connected() {
            Ok(())
        } else {
            Err(X7Error::Command("not connected".into()))
        }
    }

    /// Apply a phase transition and announce the resulting state.
    fn transition(
        &self,
        apply: impl FnOnce(&mut ConnectionPhase) -> Result<(), X7Error>,
    ) -> Result<(), X7Error> {
        let _gate = self.gate();
        let state = {
            let mut phase = self.phase();
            apply(&mut phase)?;
            phase.state()
        };
        self.events.emit(&SessionEvent::StateChanged {
            state,
            reason: None,
        });
        Ok(())
    }

    // ── Handshake ────────────────────────────────────────────────

    async fn handshake(self: &Arc<Self>, keys: &dyn KeyResolver) -> Result<(), X7Error> {
        self.transition(ConnectionPhase::begin_connect)?;

        let mut transport =
            Transport::connect(&self.config.endpoint, self.config.connect_timeout()).await?;
        transport.set_read_timeout(Some(self.config.reply_timeout()));
        *self.link.lock().await = Some(transport);
        info!("connected to {}", self.config.endpoint.control_addr());

        let reply = self.command_expect(Command::SessionInit, 0).await?;
        let token = reply.session_token()?;
        self.token.store(token, Ordering::SeqCst);
        info!("session token: {token}");

        self.command_expect(Command::RemotePair, 0).await?;

        self.start_keep_alive();

        let recording = self.read_recording_status().await?;
        self.recording.store(recording, Ordering::SeqCst);
        info!("currently recording: {recording}");

        let map = SettingMap::global(keys);
        let remote: &SessionInner = self;
        let direction = synchronize(map, remote, self.store.as_ref()).await?;
        debug!("settings synchronized ({direction:?})");

        let supported = self.negotiate_preview().await?;
        self.preview_supported.store(supported, Ordering::SeqCst);
        info!("preview supported: {supported}");
        self.start_preview(preview_period(recording));

        self.transition(ConnectionPhase::complete_connect)
    }

    async fn read_recording_status(&self) -> Result<bool, X7Error> {
        let config = self.http.fetch_config().await?;
        let raw = config
            .get("recording_status")
            .ok_or_else(|| X7Error::Connection("camera config has no recording_status".into()))?;
        let status = match raw {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| X7Error::Protocol(format!("invalid recording_status: {raw}")))?;
        Ok(status == 1)
    }

    // ── Preview negotiation ──────────────────────────────────────

    async fn negotiate_preview(&self) -> Result<bool, X7Error> {
        match self.enable_dual_streams().await? {
            StreamConfig::AlreadyOn => Ok(true),
            StreamConfig::Activated => {
                self.configure_stream(STREAM_TYPE, "mjpg").await?;
                self.configure_stream(DUAL_STREAMS, "on").await?;
                Ok(true)
            }
            StreamConfig::Rejected => Ok(false),
        }
    }

    /// First `dual streams = on`; its answer tells whether streaming was already set up.
    async fn enable_dual_streams(&self) -> Result<StreamConfig, X7Error> {
        self.command_expect(Command::SettingChangeStart, 0).await?;
        let reply = self
            .request(&Request::set_setting(self.token(), DUAL_STREAMS, "on"))
            .await?;
        if required_rval(&reply)? != 0 {
            return Ok(StreamConfig::Rejected);
        }

        let outcome = if reply.settable().is_some_and(|s| s.contains(STREAMING_OFF)) {
            StreamConfig::AlreadyOn
        } else if !reply.has("settable") {
            StreamConfig::Activated
        } else {
            return Ok(StreamConfig::Rejected);
        };
        self.command_expect(Command::SettingChangeStop, 0).await?;
        Ok(outcome)
    }

    /// One setting in its own bracket. The bracket is only closed if the camera accepted it.
    async fn configure_stream(&self, key: &str, value: &str) -> Result<(), X7Error> {
        self.command_expect(Command::SettingChangeStart, 0).await?;
        let reply = self
            .request(&Request::set_setting(self.token(), key, value))
            .await?;
        if required_rval(&reply)? == 0 {
            self.command_expect(Command::SettingChangeStop, 0).await?;
        } else {
            warn!("camera rejected {key}={value}");
        }
        Ok(())
    }

    // ── Exchanges ────────────────────────────────────────────────

    /// Write `request` and, in [`ReplyMode::Read`], wait for its answer.
    async fn exchange(&self, request: &Request, mode: ReplyMode) -> Result<Option<Reply>, X7Error> {
        let mut link = self.link.lock().await;
        let transport = link
            .as_mut()
            .ok_or_else(|| X7Error::Transport("socket does not exist".into()))?;
        exchange_on(transport, request, mode).await
    }

    async fn request(&self, request: &Request) -> Result<Reply, X7Error> {
        self.exchange(request, ReplyMode::Read)
            .await?
            .ok_or(X7Error::Assertion("camera sent no reply"))
    }

    /// Send `request` and require `rval == expected`.
    async fn request_expect(&self, request: Request, expected: i64) -> Result<Reply, X7Error> {
        let reply = self.request(&request).await?;
        let rval = required_rval(&reply)?;
        if rval != expected {
            let name = request
                .command_kind()
                .map_or_else(|| request.msg_id.to_string(), |c| c.to_string());
            return Err(X7Error::Command(format!(
                "{name}: expected return value {expected}, got {rval}"
            )));
        }
        Ok(reply)
    }

    async fn command_expect(&self, command: Command, expected: i64) -> Result<Reply, X7Error> {
        self.request_expect(Request::command(self.token(), command), expected)
            .await
    }

    /// Abort the session when an on-demand command fails, then hand the
    /// result back. Callers check `ensure_connected` first, so a rejected
    /// return value is the only `Command` error that reaches here.
    async fn escalate<T>(&self, result: Result<T, X7Error>) -> Result<T, X7Error> {
        let failure = result.as_ref().err().map(ToString::to_string);
        if let Some(why) = failure {
            error!("{why}");
            self.shutdown(Some(why)).await;
        }
        result
    }

    // ── Background ticks ─────────────────────────────────────────

    fn start_keep_alive(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let task = PeriodicTask::spawn(
            "keep-alive",
            self.config.keep_alive_interval(),
            move |token| run_tick(weak.clone(), token, "keep-alive", SessionInner::keep_alive_tick),
        );
        *lock(&self.keep_alive) = Some(task);
    }

    fn start_preview(self: &Arc<Self>, period: Duration) {
        *lock(&self.preview_period) = Some(period);
        let weak = Arc::downgrade(self);
        let task = PeriodicTask::spawn("preview", period, move |token| {
            run_tick(weak.clone(), token, "preview", SessionInner::preview_tick)
        });
        *lock(&self.preview) = Some(task);
    }

    async fn keep_alive_tick(self: Arc<Self>, token: CancellationToken) -> Result<(), X7Error> {
        self.command_expect(Command::KeepAlive, KEEP_ALIVE_RVAL).await?;
        let battery = SettingsRemote::get_setting(&*self, "battery_level").await?;
        let capacity = SettingsRemote::get_setting(&*self, "sd_card_capacity").await?;
        let status = CameraStatus::from_settings(&battery, &capacity)?;

        let _gate = self.gate();
        if !token.is_cancelled() {
            self.events.emit(&SessionEvent::StatusChanged(status));
        }
        Ok(())
    }

    async fn preview_tick(self: Arc<Self>, token: CancellationToken) -> Result<(), X7Error> {
        if !self.preview_supported.load(Ordering::SeqCst) {
            return Ok(());
        }

        let jpeg = match self.http.fetch_preview().await? {
            PreviewFetch::Frame(jpeg) => jpeg,
            PreviewFetch::Empty => return Ok(()),
            PreviewFetch::Unavailable(why) => {
                debug!("preview frame skipped: {why}");
                return Ok(());
            }
        };

        let frame = match tokio::task::spawn_blocking(move || PreviewFrame::decode(jpeg)).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!("failed to decode preview frame: {e}");
                return Ok(());
            }
            Err(e) => {
                warn!("preview decoder panicked: {e}");
                return Ok(());
            }
        };

        let _gate = self.gate();
        if !token.is_cancelled() {
            self.events
                .emit(&SessionEvent::PreviewFrame(Arc::new(frame)));
        }
        Ok(())
    }

    // ── Shutdown ─────────────────────────────────────────────────

    /// `failure` set means abnormal shutdown. Serialized and a no-op once
    /// the session is `Disconnected`.
    async fn shutdown(&self, failure: Option<String>) {
        let _serial = self.shutdown_lock.lock().await;
        let reason = failure.map(|why| format!("Abnormal shutdown: {why}"));

        {
            let _gate = self.gate();
            let mut phase = self.phase();
            if phase.is_disconnected() {
                return;
            }
            info!(
                "connection shutting down: {}",
                reason.as_deref().unwrap_or("Normal shutdown")
            );

            if reason.is_none() && phase.is_connected() {
                if phase.begin_disconnect().is_ok() {
                    drop(phase);
                    self.events.emit(&SessionEvent::StateChanged {
                        state: ConnectionState::Disconnecting,
                        reason: None,
                    });
                }
            }

            for slot in [&self.keep_alive, &self.preview] {
                if let Some(task) = lock(slot).take() {
                    task.cancel();
                }
            }
        }

        {
            let mut link = self.link.lock().await;
            if let Some(mut transport) = link.take() {
                transport.set_read_timeout(Some(self.config.close_timeout()));
                let close = Request::command(self.token(), Command::SessionClose);
                if let Err(e) = exchange_on(&mut transport, &close, ReplyMode::Read).await {
                    debug!("session close not acknowledged: {e}");
                }
                transport.close().await;
            }
        }

        tokio::time::sleep(self.config.quiescence()).await;

        let _gate = self.gate();
        let announce = {
            let mut phase = self.phase();
            let was_disconnecting = phase.state() == ConnectionState::Disconnecting;
            if phase.finish_disconnect().is_err() {
                // Abnormal teardown of an established session.
                phase.force_disconnect();
            }
            reason.is_some() || was_disconnecting
        };
        if announce {
            self.events.emit(&SessionEvent::StateChanged {
                state: ConnectionState::Disconnected,
                reason,
            });
        }
        info!("connection closed");
    }
}

#[async_trait]
impl SettingsRemote for SessionInner {
    async fn get_setting(&self, key: &str) -> Result<String, X7Error> {
        let reply = self
            .request_expect(Request::get_setting(self.token(), key), 0)
            .await?;
        reply
            .param()
            .ok_or(X7Error::Assertion("setting reply carries no param"))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), X7Error> {
        self.command_expect(Command::SettingChangeStart, 0).await?;
        let reply = self
            .request_expect(Request::set_setting(self.token(), key, value), 0)
            .await?;
        if reply.param().as_deref() != Some(value) {
            return Err(X7Error::Assertion("camera did not apply the setting value"));
        }
        self.command_expect(Command::SettingChangeStop, 0).await?;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

async fn exchange_on(
    transport: &mut Transport,
    request: &Request,
    mode: ReplyMode,
) -> Result<Option<Reply>, X7Error> {
    transport.send(request).await?;
    if mode == ReplyMode::Ignore {
        return Ok(None);
    }
    loop {
        if let Some(reply) = transport.receive().await?.resolve()? {
            return Ok(Some(reply));
        }
    }
}

fn required_rval(reply: &Reply) -> Result<i64, X7Error> {
    reply
        .rval()
        .ok_or(X7Error::Assertion("reply carries no rval"))
}

/// One scheduler tick: run `body`, and shut the session down if it fails
/// while the task is still live.
async fn run_tick<F, Fut>(
    session: Weak<SessionInner>,
    token: CancellationToken,
    name: &'static str,
    body: F,
) -> Tick
where
    F: FnOnce(Arc<SessionInner>, CancellationToken) -> Fut,
    Fut: std::future::Future<Output = Result<(), X7Error>>,
{
    let Some(inner) = session.upgrade() else {
        return Tick::Stop;
    };
    match body(inner.clone(), token.clone()).await {
        Ok(()) => Tick::Continue,
        Err(e) if token.is_cancelled() => {
            debug!("{name} tick failed after cancellation: {e}");
            Tick::Stop
        }
        Err(e) => {
            error!("{name} tick failed: {e}");
            inner.shutdown(Some(e.to_string())).await;
            Tick::Stop
        }
    }
}
