//! Command catalog of the camera's TCP API.
//!
//! Unknown wire values map through `TryFrom` into errors.

use crate::error::X7Error;
use std::fmt;

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the camera, carried as `msg_id`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // ── Session ──────────────────────────────────────────────────
    /// Open a session; the reply carries the session token.
    SessionInit = 1,
    /// Close the session.
    SessionClose = 2,
    /// Pair this client as the remote control.
    RemotePair = 8,
    /// Keep the session alive. Answered with `rval == -26`.
    KeepAlive = 64,

    // ── Capture ──────────────────────────────────────────────────
    VideoCaptureStart = 3,
    VideoCaptureStop = 4,
    TakePicture = 5,
    SwitchModeVideo = 33,
    SwitchModePicture = 34,

    // ── Settings ─────────────────────────────────────────────────
    SetSetting = 6,
    GetSetting = 7,
    SettingChangeStop = 12,
    SettingChangeStart = 13,

    // ── System ───────────────────────────────────────────────────
    PowerOff = 32,
}

impl Command {
    /// The wire code sent in the `msg_id` field.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Command {
    type Error = X7Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Command::SessionInit),
            2 => Ok(Command::SessionClose),
            3 => Ok(Command::VideoCaptureStart),
            4 => Ok(Command::VideoCaptureStop),
            5 => Ok(Command::TakePicture),
            6 => Ok(Command::SetSetting),
            7 => Ok(Command::GetSetting),
            8 => Ok(Command::RemotePair),
            12 => Ok(Command::SettingChangeStop),
            13 => Ok(Command::SettingChangeStart),
            32 => Ok(Command::PowerOff),
            33 => Ok(Command::SwitchModeVideo),
            34 => Ok(Command::SwitchModePicture),
            64 => Ok(Command::KeepAlive),
            _ => Err(X7Error::UnknownVariant {
                type_name: "Command",
                value: value as i64,
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── SettingVerb ──────────────────────────────────────────────────

/// The four verbs of the camera's key/value settings store.
///
/// A `Set` must be enclosed by `StartChange` / `StopChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingVerb {
    Get,
    StartChange,
    Set,
    StopChange,
}

impl SettingVerb {
    pub fn command(self) -> Command {
        match self {
            SettingVerb::Get => Command::GetSetting,
            SettingVerb::StartChange => Command::SettingChangeStart,
            SettingVerb::Set => Command::SetSetting,
            SettingVerb::StopChange => Command::SettingChangeStop,
        }
    }
}

// ── ReplyMode ────────────────────────────────────────────────────

/// Whether an exchange waits for the camera's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    #[default]
    Read,
    /// Write only. Used for `PowerOff`, which the camera may never answer.
    Ignore,
}
